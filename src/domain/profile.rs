use crate::domain::profile::driven_ports::{ProfileReader, ProfileWriter};
use crate::domain::profile::driving_ports::ProfileError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-user details kept next to the auth provider's account, keyed by the user's ID
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub mod driven_ports {
    use super::*;

    pub trait ProfileReader {
        async fn profile_by_id(
            &self,
            user_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Profile>, anyhow::Error>;
    }

    pub trait ProfileWriter {
        /// Rewrites the name and bumps `updated_at`. Returns false if the user has no profile row.
        async fn update_name(
            &self,
            user_id: Uuid,
            name: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        /// Stores the login time, creating the profile row if it does not exist yet
        async fn record_login(
            &self,
            user_id: Uuid,
            logged_in_at: DateTime<Utc>,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ProfileError {
        #[error("the user has no profile")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait ProfilePort {
        async fn get_profile(
            &self,
            user_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            profile_read: &impl driven_ports::ProfileReader,
        ) -> Result<Option<Profile>, ProfileError>;
        async fn update_name(
            &self,
            user_id: Uuid,
            name: &str,
            ext_cxn: &impl ExternalConnectivity,
            profile_write: &impl driven_ports::ProfileWriter,
        ) -> Result<(), ProfileError>;
    }
}

pub struct ProfileService {}

impl driving_ports::ProfilePort for ProfileService {
    async fn get_profile(
        &self,
        user_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        profile_read: &impl ProfileReader,
    ) -> Result<Option<Profile>, ProfileError> {
        let profile = profile_read
            .profile_by_id(user_id, ext_cxn)
            .await
            .context("fetching a profile")?;

        Ok(profile)
    }

    async fn update_name(
        &self,
        user_id: Uuid,
        name: &str,
        ext_cxn: &impl ExternalConnectivity,
        profile_write: &impl ProfileWriter,
    ) -> Result<(), ProfileError> {
        let updated = profile_write
            .update_name(user_id, name, ext_cxn)
            .await
            .context("renaming a profile")?;
        if !updated {
            return Err(ProfileError::NotFound);
        }

        Ok(())
    }
}
