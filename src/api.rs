pub mod auth;
pub mod comment;
pub mod pages;
pub mod profile;
pub mod swagger_main;
pub mod todo;

#[cfg(test)]
pub mod test_util;
