use crate::domain;
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Fields of the sign in and sign up forms, in the order their problems should be reported
pub const CREDENTIAL_FORM_FIELDS: [&str; 2] = ["email", "password"];

const CREDENTIALS_REQUIRED: &str = "メールアドレスとパスワードを入力してください";

fn required_credential(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut missing = ValidationError::new("required");
        missing.message = Some(Cow::from(CREDENTIALS_REQUIRED));
        return Err(missing);
    }

    Ok(())
}

/// DTO for the sign in form
#[derive(Deserialize, Validate)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct SignInForm {
    #[serde(default)]
    #[validate(custom = "required_credential")]
    pub email: String,
    #[serde(default)]
    #[validate(custom = "required_credential")]
    pub password: String,
}

impl From<&SignInForm> for domain::auth::Credentials {
    fn from(value: &SignInForm) -> Self {
        domain::auth::Credentials {
            email: value.email.clone(),
            password: value.password.clone(),
        }
    }
}

/// DTO for the sign up form
#[derive(Deserialize, Validate)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct SignUpForm {
    #[serde(default)]
    #[validate(custom = "required_credential")]
    pub email: String,
    #[serde(default)]
    #[validate(
        custom = "required_credential",
        length(min = 8, message = "パスワードは8文字以上で入力してください")
    )]
    pub password: String,
}

impl From<&SignUpForm> for domain::auth::Credentials {
    fn from(value: &SignUpForm) -> Self {
        domain::auth::Credentials {
            email: value.email.clone(),
            password: value.password.clone(),
        }
    }
}

/// Query string of the link in a confirmation email
#[derive(Deserialize, Debug)]
pub struct ConfirmParams {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
