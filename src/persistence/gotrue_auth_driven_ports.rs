use super::{backend_request, successful};
use crate::domain;
use crate::domain::auth::driven_ports::AuthProviderError;
use crate::domain::auth::{Credentials, Identity, Session, SessionTokens};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow};
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    email: Option<String>,
}

impl From<UserBody> for Identity {
    fn from(value: UserBody) -> Self {
        Identity {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    user: UserBody,
}

impl From<SessionBody> for Session {
    fn from(value: SessionBody) -> Self {
        Session {
            tokens: SessionTokens {
                access_token: value.access_token,
                refresh_token: value.refresh_token,
            },
            identity: value.user.into(),
        }
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    token_hash: &'a str,
}

/// Pulls the human-readable reason out of an auth error body. The provider has used several
/// field names for it over time.
fn rejection_reason(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|json| {
            ["error_description", "msg", "message", "error"]
                .into_iter()
                .find_map(|field| json.get(field).and_then(Value::as_str))
        })
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_owned())
}

/// Client errors mean the provider refused the request; anything else is a failure to reach it
async fn refused_or_failed(response: Response, action: &str) -> AuthProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        return AuthProviderError::Rejected(rejection_reason(&body));
    }

    AuthProviderError::CommsFailure(anyhow!("{action} failed with status {status}: {body}"))
}

/// Reads a session out of a successful response, or classifies the failure
async fn session_from(response: Response, action: &str) -> Result<Session, AuthProviderError> {
    if !response.status().is_success() {
        return Err(refused_or_failed(response, action).await);
    }

    let body: SessionBody = response
        .json()
        .await
        .with_context(|| format!("decoding the session from {action}"))?;
    Ok(body.into())
}

pub struct GoTrueAuthProvider;

impl domain::auth::driven_ports::AuthProvider for GoTrueAuthProvider {
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Session, AuthProviderError> {
        let response = backend_request(ext_cxn, Method::POST, "auth/v1/token")?
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .context("requesting a password grant")?;

        session_from(response, "signing in").await
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        redirect_to: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), AuthProviderError> {
        let response = backend_request(ext_cxn, Method::POST, "auth/v1/signup")?
            .query(&[("redirect_to", redirect_to)])
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .context("requesting a sign up")?;
        if !response.status().is_success() {
            return Err(refused_or_failed(response, "signing up").await);
        }

        Ok(())
    }

    async fn verify_email(
        &self,
        token_hash: &str,
        kind: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Session, AuthProviderError> {
        let response = backend_request(ext_cxn, Method::POST, "auth/v1/verify")?
            .json(&VerifyBody { kind, token_hash })
            .send()
            .await
            .context("requesting email verification")?;

        session_from(response, "verifying an email").await
    }

    async fn user_for_token(
        &self,
        access_token: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<Identity>, Error> {
        let user_cxn = ext_cxn.acting_as(access_token);
        let response = backend_request(&user_cxn, Method::GET, "auth/v1/user")?
            .send()
            .await
            .context("requesting the user for an access token")?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let user: UserBody = successful(response, "looking up a user")
            .await?
            .json()
            .await
            .context("decoding a user")?;
        Ok(Some(user.into()))
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<Session>, Error> {
        let response = backend_request(ext_cxn, Method::POST, "auth/v1/token")?
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant { refresh_token })
            .send()
            .await
            .context("requesting a refresh grant")?;

        match session_from(response, "refreshing a session").await {
            Ok(session) => Ok(Some(session)),
            Err(AuthProviderError::Rejected(_)) => Ok(None),
            Err(AuthProviderError::CommsFailure(cause)) => Err(cause),
        }
    }

    async fn sign_out(
        &self,
        access_token: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let user_cxn = ext_cxn.acting_as(access_token);
        let response = backend_request(&user_cxn, Method::POST, "auth/v1/logout")?
            .send()
            .await
            .context("requesting sign out")?;
        // The session is already gone on the provider's side
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(());
        }
        successful(response, "signing out").await?;

        Ok(())
    }
}
