pub mod auth;
pub mod comment;
pub mod profile;
pub mod todo;

#[cfg(test)]
pub mod test_util;
