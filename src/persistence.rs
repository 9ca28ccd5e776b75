pub mod gotrue_auth_driven_ports;
pub mod realtime_comment_feed;
pub mod rest_comment_driven_ports;
pub mod rest_profile_driven_ports;
pub mod rest_todo_driven_ports;

use crate::external_connections;
use anyhow::{Context, anyhow};
use reqwest::{Method, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How long to wait for the backend to accept a connection before giving up on a request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Data structure which owns the client for reaching the hosted backend along with the
/// credentials to present to it. Allows business logic to be agnostic of the backend so
/// driven adapters can easily be swapped out for other implementations.
#[derive(Clone)]
pub struct ExternalConnectivity {
    http_client: ClientWithMiddleware,
    backend_url: Arc<Url>,
    api_key: Arc<str>,
    access_token: Option<Arc<str>>,
}

impl ExternalConnectivity {
    /// Builds a traced HTTP client and pairs it with the backend's location and public key.
    /// Requests made through the result are anonymous until [acting_as] is used.
    ///
    /// [acting_as]: external_connections::ExternalConnectivity::acting_as
    pub fn new(backend_url: Url, api_key: &str) -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("building the backend HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ExternalConnectivity {
            http_client,
            backend_url: Arc::new(backend_url),
            api_key: Arc::from(api_key),
            access_token: None,
        })
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    fn http_client(&self) -> &ClientWithMiddleware {
        &self.http_client
    }

    fn backend_url(&self) -> &Url {
        &self.backend_url
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&*self.api_key)
    }

    fn acting_as(&self, access_token: &str) -> Self {
        ExternalConnectivity {
            access_token: Some(Arc::from(access_token)),
            ..self.clone()
        }
    }
}

/// Starts a request against a backend endpoint, authenticated as whoever `ext_cxn` is acting for
fn backend_request(
    ext_cxn: &impl external_connections::ExternalConnectivity,
    method: Method,
    path: &str,
) -> Result<RequestBuilder, anyhow::Error> {
    let url = ext_cxn
        .backend_url()
        .join(path)
        .with_context(|| format!("building backend URL for {path}"))?;

    Ok(ext_cxn
        .http_client()
        .request(method, url)
        .header("apikey", ext_cxn.api_key())
        .bearer_auth(ext_cxn.bearer_token()))
}

/// Starts a request against one of the backend's tables
fn table_request(
    ext_cxn: &impl external_connections::ExternalConnectivity,
    method: Method,
    table: &str,
) -> Result<RequestBuilder, anyhow::Error> {
    backend_request(ext_cxn, method, &format!("rest/v1/{table}"))
}

/// Passes a response through if it succeeded, otherwise turns its status and body into an error
async fn successful(response: Response, action: &str) -> Result<Response, anyhow::Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("{action} failed with status {status}: {body}"))
}

/// Builds an `eq.` filter value for a PostgREST query parameter
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}
