use crate::domain::auth::driving_ports::AuthPort;
use crate::domain::auth::{Identity, SessionResolution, SessionTokens};
use crate::external_connections::ExternalConnectivity;
use crate::{SharedData, domain, persistence};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const ACCESS_TOKEN_COOKIE: &str = "todo_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "todo_refresh_token";
const SESSION_COOKIE_LIFETIME_DAYS: i64 = 30;

/// The user behind the current request, along with the token their backend calls are made with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub identity: Identity,
    pub access_token: String,
}

impl ActiveSession {
    /// Connectivity which acts as this user, so the backend's row-level policies apply
    pub fn connectivity<C: ExternalConnectivity>(&self, ext_cxn: &C) -> C {
        ext_cxn.acting_as(&self.access_token)
    }
}

/// Change to the browser's session cookies that should go out with the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    Started(SessionTokens),
    Cleared,
}

/// Sets or clears the session cookies on a response
pub struct SetSessionCookies {
    pub update: CookieUpdate,
    pub secure: bool,
}

impl SetSessionCookies {
    pub fn started(tokens: SessionTokens, secure: bool) -> Self {
        SetSessionCookies {
            update: CookieUpdate::Started(tokens),
            secure,
        }
    }

    pub fn cleared(secure: bool) -> Self {
        SetSessionCookies {
            update: CookieUpdate::Cleared,
            secure,
        }
    }

    fn cookies(&self) -> [Cookie<'static>; 2] {
        match &self.update {
            CookieUpdate::Started(tokens) => [
                session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), self.secure),
                session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), self.secure),
            ],
            CookieUpdate::Cleared => [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE].map(|name| {
                let mut removal = session_cookie(name, String::new(), self.secure);
                removal.make_removal();
                removal
            }),
        }
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::days(SESSION_COOKIE_LIFETIME_DAYS))
        .build()
}

impl IntoResponseParts for SetSessionCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.cookies() {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(header_value) => {
                    res.headers_mut().append(SET_COOKIE, header_value);
                }
                Err(header_err) => warn!(
                    cookie = cookie.name(),
                    "Session cookie could not be sent as a header: {header_err}"
                ),
            }
        }

        Ok(res)
    }
}

/// Reads one cookie from the request headers
pub fn request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

/// What the session middleware found out about a request's tokens
#[derive(Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session: Option<ActiveSession>,
    pub cookies: Option<CookieUpdate>,
}

/// Works out who is making the request from the tokens their browser sent
pub async fn session_for_tokens(
    access_token: Option<String>,
    refresh_token: Option<String>,
    ext_cxn: &impl ExternalConnectivity,
    auth_service: &impl AuthPort,
) -> SessionOutcome {
    let auth_provider = persistence::gotrue_auth_driven_ports::GoTrueAuthProvider;
    let resolution = auth_service
        .resolve_session(
            access_token.as_deref(),
            refresh_token.as_deref(),
            ext_cxn,
            &auth_provider,
        )
        .await;

    match resolution {
        Ok(SessionResolution::Anonymous) => SessionOutcome {
            session: None,
            cookies: None,
        },
        Ok(SessionResolution::Active(identity)) => SessionOutcome {
            session: Some(ActiveSession {
                identity,
                access_token: access_token.unwrap_or_default(),
            }),
            cookies: None,
        },
        Ok(SessionResolution::Refreshed(refreshed)) => {
            debug!(user_id = %refreshed.identity.id, "Session refreshed");
            SessionOutcome {
                session: Some(ActiveSession {
                    identity: refreshed.identity,
                    access_token: refreshed.tokens.access_token.clone(),
                }),
                cookies: Some(CookieUpdate::Started(refreshed.tokens)),
            }
        }
        Ok(SessionResolution::Expired) => {
            debug!("Session expired, clearing cookies");
            SessionOutcome {
                session: None,
                cookies: Some(CookieUpdate::Cleared),
            }
        }
        // Cookies are left alone until the provider is reachable again
        Err(resolve_err) => {
            error!("Could not resolve the session: {resolve_err:#}");
            SessionOutcome {
                session: None,
                cookies: None,
            }
        }
    }
}

/// Middleware which resolves the session cookies of every request. Handlers find the result
/// through the [SignedIn] and [MaybeSignedIn] extractors.
pub async fn resolve_session(
    State(app_state): State<Arc<SharedData>>,
    mut request: Request,
    next: Next,
) -> Response {
    let access_token = request_cookie(request.headers(), ACCESS_TOKEN_COOKIE);
    let refresh_token = request_cookie(request.headers(), REFRESH_TOKEN_COOKIE);
    let auth_service = domain::auth::AuthService {};

    let outcome = session_for_tokens(
        access_token,
        refresh_token,
        &app_state.ext_cxn,
        &auth_service,
    )
    .await;
    if let Some(session) = outcome.session {
        request.extensions_mut().insert(session);
    }

    let response = next.run(request).await;
    match outcome.cookies {
        // Cookies set by the handler take precedence
        Some(update) if !response.headers().contains_key(SET_COOKIE) => (
            SetSessionCookies {
                update,
                secure: app_state.config.serves_https(),
            },
            response,
        )
            .into_response(),
        _ => response,
    }
}

/// Extracts the signed-in user, sending anyone else to the sign in page
pub struct SignedIn(pub ActiveSession);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SignedIn {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActiveSession>()
            .cloned()
            .map(SignedIn)
            .ok_or_else(|| Redirect::to("/signin"))
    }
}

/// Extracts the signed-in user if there is one
pub struct MaybeSignedIn(pub Option<ActiveSession>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeSignedIn {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSignedIn(parts.extensions.get::<ActiveSession>().cloned()))
    }
}
