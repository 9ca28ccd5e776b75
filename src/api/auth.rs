use crate::domain::auth::Session;
use crate::domain::auth::driving_ports::{AuthError, AuthPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ActionError, ActionRedirect};
use crate::session::{ActiveSession, MaybeSignedIn, SetSessionCookies};
use crate::views::Views;
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

const SIGN_UP_SENT: &str = "確認メールを送信しました。メールをご確認ください。";

/// Adds the sign in, sign up, email confirmation and sign out endpoints to the application router
pub fn auth_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/signin",
            get(|State(app_state): AppState, MaybeSignedIn(session): MaybeSignedIn| async move {
                credentials_page(&app_state.views, "signin.html", "", None, session.is_some())
            })
            .post(|State(app_state): AppState, Form(form): Form<dto::SignInForm>| async move {
                let auth_service = domain::auth::AuthService {};

                match sign_in(&form, &app_state.ext_cxn, &auth_service).await {
                    Ok(session) => signed_in_redirect(session, app_state.config.serves_https()),
                    Err(action_err) => credentials_page(
                        &app_state.views,
                        "signin.html",
                        &form.email,
                        Some(&action_err),
                        false,
                    ),
                }
            }),
        )
        .route(
            "/signup",
            get(|State(app_state): AppState, MaybeSignedIn(session): MaybeSignedIn| async move {
                credentials_page(&app_state.views, "signup.html", "", None, session.is_some())
            })
            .post(|State(app_state): AppState, Form(form): Form<dto::SignUpForm>| async move {
                let auth_service = domain::auth::AuthService {};
                let redirect_to = app_state.config.email_confirmation_url();

                match sign_up(&form, &redirect_to, &app_state.ext_cxn, &auth_service).await {
                    Ok(()) => sign_up_sent_page(&app_state.views),
                    Err(action_err) => credentials_page(
                        &app_state.views,
                        "signup.html",
                        &form.email,
                        Some(&action_err),
                        false,
                    ),
                }
            }),
        )
        .route(
            "/auth/confirm",
            get(|State(app_state): AppState, Query(params): Query<dto::ConfirmParams>| async move {
                let auth_service = domain::auth::AuthService {};

                match confirm_email(&params, &app_state.ext_cxn, &auth_service).await {
                    Ok(session) => signed_in_redirect(session, app_state.config.serves_https()),
                    Err(_) => Redirect::to("/error").into_response(),
                }
            }),
        )
        .route(
            "/auth/signout",
            post(|State(app_state): AppState, MaybeSignedIn(session): MaybeSignedIn| async move {
                let auth_service = domain::auth::AuthService {};

                sign_out(session.as_ref(), &app_state.ext_cxn, &auth_service).await;
                (
                    SetSessionCookies::cleared(app_state.config.serves_https()),
                    ActionRedirect::to("/signin", &["/"]),
                )
            }),
        )
}

/// Hands the browser its new session and sends it to the task list
fn signed_in_redirect(session: Session, secure: bool) -> Response {
    (
        SetSessionCookies::started(session.tokens, secure),
        ActionRedirect::to("/todos", &["/"]),
    )
        .into_response()
}

/// Renders the sign in or sign up form, keeping the email the user typed
fn credentials_page(
    views: &Views,
    template: &str,
    email: &str,
    action_err: Option<&ActionError>,
    signed_in: bool,
) -> Response {
    let mut context = Views::context(signed_in);
    context.insert("email", email);
    context.insert("success", &Option::<&str>::None);
    context.insert("error", &action_err.map(ActionError::message));

    let status = action_err.map_or(StatusCode::OK, ActionError::status);
    views.render_with_status(status, template, &context)
}

fn sign_up_sent_page(views: &Views) -> Response {
    let mut context = Views::context(false);
    context.insert("email", "");
    context.insert("success", SIGN_UP_SENT);

    views.render("signup.html", &context)
}

/// Signs in with email and password
async fn sign_in(
    form: &dto::SignInForm,
    ext_cxn: &impl ExternalConnectivity,
    auth_service: &impl AuthPort,
) -> Result<Session, ActionError> {
    form.validate()
        .map_err(|errs| ActionError::from_validation(&errs, &dto::CREDENTIAL_FORM_FIELDS))?;
    info!("Sign in attempt");

    let auth_provider = persistence::gotrue_auth_driven_ports::GoTrueAuthProvider;
    let profile_writer = persistence::rest_profile_driven_ports::RestProfileWriter;
    let credentials = domain::auth::Credentials::from(form);
    let sign_in_result = auth_service
        .sign_in(&credentials, ext_cxn, &auth_provider, &profile_writer)
        .await;
    match sign_in_result {
        Ok(session) => {
            info!(user_id = %session.identity.id, "Signed in");
            Ok(session)
        }
        Err(AuthError::Rejected(reason)) => Err(ActionError::invalid(reason)),
        Err(AuthError::PortError(cause)) => {
            error!("Sign in failure: {cause:#}");
            Err(ActionError::failed("ログインに失敗しました"))
        }
    }
}

/// Registers an account. The provider mails a link back to `redirect_to`.
async fn sign_up(
    form: &dto::SignUpForm,
    redirect_to: &str,
    ext_cxn: &impl ExternalConnectivity,
    auth_service: &impl AuthPort,
) -> Result<(), ActionError> {
    form.validate()
        .map_err(|errs| ActionError::from_validation(&errs, &dto::CREDENTIAL_FORM_FIELDS))?;
    info!("Sign up attempt");

    let auth_provider = persistence::gotrue_auth_driven_ports::GoTrueAuthProvider;
    let credentials = domain::auth::Credentials::from(form);
    let sign_up_result = auth_service
        .sign_up(&credentials, redirect_to, ext_cxn, &auth_provider)
        .await;
    match sign_up_result {
        Ok(()) => Ok(()),
        Err(AuthError::Rejected(reason)) => Err(ActionError::invalid(reason)),
        Err(AuthError::PortError(cause)) => {
            error!("Sign up failure: {cause:#}");
            Err(ActionError::failed("登録に失敗しました"))
        }
    }
}

/// Completes the link from a confirmation email
async fn confirm_email(
    params: &dto::ConfirmParams,
    ext_cxn: &impl ExternalConnectivity,
    auth_service: &impl AuthPort,
) -> Result<Session, ActionError> {
    let (Some(token_hash), Some(kind)) = (params.token_hash.as_deref(), params.kind.as_deref()) else {
        warn!("Confirmation link is missing its token");
        return Err(ActionError::invalid("確認リンクが無効です"));
    };

    let auth_provider = persistence::gotrue_auth_driven_ports::GoTrueAuthProvider;
    let profile_writer = persistence::rest_profile_driven_ports::RestProfileWriter;
    let confirm_result = auth_service
        .confirm_email(token_hash, kind, ext_cxn, &auth_provider, &profile_writer)
        .await;
    match confirm_result {
        Ok(session) => {
            info!(user_id = %session.identity.id, "Email confirmed");
            Ok(session)
        }
        Err(AuthError::Rejected(reason)) => {
            warn!("Confirmation rejected: {reason}");
            Err(ActionError::invalid(reason))
        }
        Err(AuthError::PortError(cause)) => {
            error!("Email confirmation failure: {cause:#}");
            Err(ActionError::failed("確認に失敗しました"))
        }
    }
}

/// Revokes the current session at the provider. Failures are logged and otherwise ignored,
/// the browser's cookies are cleared regardless.
async fn sign_out(
    session: Option<&ActiveSession>,
    ext_cxn: &impl ExternalConnectivity,
    auth_service: &impl AuthPort,
) {
    let Some(session) = session else {
        return;
    };
    info!(user_id = %session.identity.id, "Signing out");

    let auth_provider = persistence::gotrue_auth_driven_ports::GoTrueAuthProvider;
    if let Err(sign_out_err) = auth_service
        .sign_out(&session.access_token, ext_cxn, &auth_provider)
        .await
    {
        warn!("Could not revoke session: {sign_out_err:#}");
    }
}
