use reqwest_middleware::ClientWithMiddleware;
use url::Url;

/// Everything a driven adapter needs to talk to the hosted backend on behalf of the current request.
/// Business logic only passes this through, so adapters can be swapped for in-memory fakes in tests.
pub trait ExternalConnectivity {
    /// HTTP client (with tracing middleware) used for every backend call
    fn http_client(&self) -> &ClientWithMiddleware;

    /// Base URL of the backend project
    fn backend_url(&self) -> &Url;

    /// Public API key of the backend project, sent as the `apikey` header
    fn api_key(&self) -> &str;

    /// Credential sent as `Authorization: Bearer`. This is the signed-in user's access token when
    /// acting for a user so that row-level security applies, and the public key otherwise.
    fn bearer_token(&self) -> &str;

    /// A copy of this connectivity which presents the given user access token as its credential
    fn acting_as(&self, access_token: &str) -> Self
    where
        Self: Sized;
}
