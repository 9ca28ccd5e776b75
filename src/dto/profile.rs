use crate::domain::auth::Identity;
use crate::domain::profile::Profile;
use crate::views;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// DTO for the profile form on "my page"
#[derive(Deserialize, Debug)]
#[cfg_attr(test, derive(Serialize))]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
}

/// The signed-in user's account and profile as "my page" displays them
#[derive(Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub last_login: String,
}

impl ProfileView {
    pub fn new(identity: &Identity, profile: Option<&Profile>) -> Self {
        ProfileView {
            user_id: identity.id,
            email: identity.email.clone().unwrap_or_default(),
            name: profile
                .and_then(|profile| profile.name.clone())
                .unwrap_or_default(),
            last_login: profile
                .and_then(|profile| profile.last_login)
                .map(views::display_datetime)
                .unwrap_or_else(|| "情報なし".to_owned()),
        }
    }
}
