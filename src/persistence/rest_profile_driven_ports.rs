use super::{eq, successful, table_request};
use crate::domain;
use crate::domain::profile::Profile;
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PROFILES: &str = "profiles";

#[derive(Deserialize)]
struct ProfileRow {
    id: Uuid,
    name: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(value: ProfileRow) -> Self {
        Profile {
            id: value.id,
            name: value.name,
            last_login: value.last_login,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize)]
struct RenameRow<'a> {
    name: &'a str,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LoginRow {
    id: Uuid,
    last_login: DateTime<Utc>,
}

pub struct RestProfileReader;

impl domain::profile::driven_ports::ProfileReader for RestProfileReader {
    async fn profile_by_id(
        &self,
        user_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<Profile>, Error> {
        let response = table_request(ext_cxn, Method::GET, PROFILES)?
            .query(&[("select", "*".to_owned()), ("id", eq(user_id))])
            .send()
            .await
            .context("requesting a profile")?;
        let rows: Vec<ProfileRow> = successful(response, "fetching a profile")
            .await?
            .json()
            .await
            .context("decoding a profile")?;

        Ok(rows.into_iter().next().map(Profile::from))
    }
}

pub struct RestProfileWriter;

impl domain::profile::driven_ports::ProfileWriter for RestProfileWriter {
    async fn update_name(
        &self,
        user_id: Uuid,
        name: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let response = table_request(ext_cxn, Method::PATCH, PROFILES)?
            .header("Prefer", "return=representation")
            .query(&[("id", eq(user_id)), ("select", "id".to_owned())])
            .json(&RenameRow {
                name,
                updated_at: Utc::now(),
            })
            .send()
            .await
            .context("renaming a profile")?;
        let touched: Vec<IgnoredAny> = successful(response, "renaming a profile")
            .await?
            .json()
            .await
            .context("decoding renamed profile IDs")?;

        Ok(!touched.is_empty())
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        logged_in_at: DateTime<Utc>,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let response = table_request(ext_cxn, Method::POST, PROFILES)?
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "id")])
            .json(&LoginRow {
                id: user_id,
                last_login: logged_in_at,
            })
            .send()
            .await
            .context("upserting a profile's last login")?;
        successful(response, "recording a login").await?;

        Ok(())
    }
}
