use crate::app_env;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::info;
use url::Url;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Settings read from the environment once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    pub site_url: Url,
    pub bind_address: SocketAddr,
    pub otel_span_export_url: Option<String>,
    pub otel_metric_export_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the {0} environment variable must be set")]
    Missing(&'static str),
    #[error("the {name} environment variable is not a valid URL: {cause}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        cause: url::ParseError,
    },
    #[error("the {name} environment variable is not a valid socket address: {value}")]
    InvalidAddress { name: &'static str, value: String },
}

impl AppConfig {
    /// Reads configuration from the process environment. Call after loading any .env file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup so the parsing rules can be exercised
    /// without touching the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let parse_url = |name: &'static str| {
            Url::parse(&required(name)?).map_err(|cause| ConfigError::InvalidUrl { name, cause })
        };

        let bind_address_raw = lookup(app_env::BIND_ADDRESS).unwrap_or_else(|| {
            info!("{} not set, using default: {DEFAULT_BIND_ADDRESS}", app_env::BIND_ADDRESS);
            DEFAULT_BIND_ADDRESS.to_owned()
        });
        let bind_address: SocketAddr =
            bind_address_raw
                .parse()
                .map_err(|_| ConfigError::InvalidAddress {
                    name: app_env::BIND_ADDRESS,
                    value: bind_address_raw.clone(),
                })?;

        Ok(AppConfig {
            supabase_url: parse_url(app_env::SUPABASE_URL)?,
            supabase_anon_key: required(app_env::SUPABASE_ANON_KEY)?,
            site_url: parse_url(app_env::SITE_URL)?,
            bind_address,
            otel_span_export_url: lookup(app_env::OTEL_SPAN_EXPORT_URL),
            otel_metric_export_url: lookup(app_env::OTEL_METRIC_EXPORT_URL),
        })
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn serves_https(&self) -> bool {
        self.site_url.scheme() == "https"
    }

    /// Link the auth provider embeds in the sign-up confirmation email
    pub fn email_confirmation_url(&self) -> String {
        format!("{}/auth/confirm", self.site_url.as_str().trim_end_matches('/'))
    }
}
