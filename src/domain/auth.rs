use crate::domain::auth::driven_ports::{AuthProvider, AuthProviderError};
use crate::domain::auth::driving_ports::AuthError;
use crate::domain::profile::driven_ports::ProfileWriter;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// The account behind a valid access token
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Token pair issued by the auth provider. The access token is short-lived and the
/// refresh token trades for a new pair once it expires.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Session {
    pub tokens: SessionTokens,
    pub identity: Identity,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of checking the tokens a browser presented
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum SessionResolution {
    /// No tokens were presented
    Anonymous,
    /// The access token is still valid
    Active(Identity),
    /// The access token had expired but the refresh token was traded for a new pair
    Refreshed(Session),
    /// Tokens were presented but none of them are usable anymore
    Expired,
}

pub mod driven_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum AuthProviderError {
        /// The provider understood the request and refused it
        #[error("auth provider refused the request: {0}")]
        Rejected(String),
        #[error(transparent)]
        CommsFailure(#[from] anyhow::Error),
    }

    pub trait AuthProvider {
        async fn sign_in_with_password(
            &self,
            credentials: &Credentials,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Session, AuthProviderError>;

        /// Registers an account. The provider mails a confirmation link which returns the
        /// user to `redirect_to`.
        async fn sign_up(
            &self,
            credentials: &Credentials,
            redirect_to: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), AuthProviderError>;

        /// Trades the token hash from a confirmation link for a session
        async fn verify_email(
            &self,
            token_hash: &str,
            kind: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Session, AuthProviderError>;

        /// Looks up the account behind an access token. Returns None if the token is expired or invalid.
        async fn user_for_token(
            &self,
            access_token: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Identity>, anyhow::Error>;

        /// Returns None if the refresh token has been used, revoked, or never existed
        async fn refresh_session(
            &self,
            refresh_token: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Session>, anyhow::Error>;

        async fn sign_out(
            &self,
            access_token: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum AuthError {
        #[error("authentication was rejected: {0}")]
        Rejected(String),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<AuthProviderError> for AuthError {
        fn from(value: AuthProviderError) -> Self {
            match value {
                AuthProviderError::Rejected(reason) => AuthError::Rejected(reason),
                AuthProviderError::CommsFailure(cause) => AuthError::PortError(cause),
            }
        }
    }


    pub trait AuthPort {
        /// Signs in with email and password and stamps the user's last login time
        async fn sign_in(
            &self,
            credentials: &Credentials,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
            profile_write: &impl ProfileWriter,
        ) -> Result<Session, AuthError>;
        async fn sign_up(
            &self,
            credentials: &Credentials,
            redirect_to: &str,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<(), AuthError>;
        /// Completes a confirmation link, signing the user in
        async fn confirm_email(
            &self,
            token_hash: &str,
            kind: &str,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
            profile_write: &impl ProfileWriter,
        ) -> Result<Session, AuthError>;
        async fn resolve_session(
            &self,
            access_token: Option<&str>,
            refresh_token: Option<&str>,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<SessionResolution, AuthError>;
        async fn sign_out(
            &self,
            access_token: &str,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<(), AuthError>;
    }
}

pub struct AuthService {}

impl AuthService {
    /// Profile rows are only writable by their owner, so the login stamp is written as the new session
    async fn record_login(
        &self,
        session: &Session,
        ext_cxn: &impl ExternalConnectivity,
        profile_write: &impl ProfileWriter,
    ) {
        let user_cxn = ext_cxn.acting_as(&session.tokens.access_token);
        let record_result = profile_write
            .record_login(session.identity.id, Utc::now(), &user_cxn)
            .await;
        if let Err(record_err) = record_result {
            warn!(user_id = %session.identity.id, "Could not record login time: {record_err:#}");
        }
    }
}

impl driving_ports::AuthPort for AuthService {
    async fn sign_in(
        &self,
        credentials: &Credentials,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
        profile_write: &impl ProfileWriter,
    ) -> Result<Session, AuthError> {
        let session = auth.sign_in_with_password(credentials, ext_cxn).await?;
        info!(user_id = %session.identity.id, "User signed in");
        self.record_login(&session, ext_cxn, profile_write).await;

        Ok(session)
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        redirect_to: &str,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<(), AuthError> {
        auth.sign_up(credentials, redirect_to, ext_cxn).await?;

        Ok(())
    }

    async fn confirm_email(
        &self,
        token_hash: &str,
        kind: &str,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
        profile_write: &impl ProfileWriter,
    ) -> Result<Session, AuthError> {
        let session = auth.verify_email(token_hash, kind, ext_cxn).await?;
        info!(user_id = %session.identity.id, "User confirmed their email");
        self.record_login(&session, ext_cxn, profile_write).await;

        Ok(session)
    }

    async fn resolve_session(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<SessionResolution, AuthError> {
        if access_token.is_none() && refresh_token.is_none() {
            return Ok(SessionResolution::Anonymous);
        }

        if let Some(access_token) = access_token {
            let identity = auth
                .user_for_token(access_token, ext_cxn)
                .await
                .context("checking an access token")?;
            if let Some(identity) = identity {
                return Ok(SessionResolution::Active(identity));
            }
        }

        let Some(refresh_token) = refresh_token else {
            return Ok(SessionResolution::Expired);
        };
        let refreshed = auth
            .refresh_session(refresh_token, ext_cxn)
            .await
            .context("refreshing a session")?;

        Ok(match refreshed {
            Some(session) => SessionResolution::Refreshed(session),
            None => SessionResolution::Expired,
        })
    }

    async fn sign_out(
        &self,
        access_token: &str,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<(), AuthError> {
        auth.sign_out(access_token, ext_cxn)
            .await
            .context("signing out")?;

        Ok(())
    }
}
