use crate::domain::profile::driving_ports::{ProfileError, ProfilePort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ActionError, ActionRedirect};
use crate::session::{ActiveSession, MaybeSignedIn, SignedIn};
use crate::views::Views;
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Form, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use tracing::{error, info, warn};

const UPDATE_FAILED: &str = "プロフィールの更新に失敗しました";

/// Adds "my page", where users see their account and rename themselves
pub fn profile_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/mypage",
        get(|State(app_state): AppState, SignedIn(session): SignedIn| async move {
            let profile_service = domain::profile::ProfileService {};

            my_page(&session, None, &app_state.ext_cxn, &profile_service, &app_state.views).await
        })
        .post(
            |State(app_state): AppState,
             MaybeSignedIn(session): MaybeSignedIn,
             Form(form): Form<dto::ProfileForm>| async move {
                let profile_service = domain::profile::ProfileService {};

                let update_result =
                    update_profile(session.as_ref(), &form, &app_state.ext_cxn, &profile_service).await;
                match (update_result, session) {
                    (Ok(redirect), _) => redirect.into_response(),
                    (Err(update_err), Some(session)) => {
                        my_page(
                            &session,
                            Some(&update_err),
                            &app_state.ext_cxn,
                            &profile_service,
                            &app_state.views,
                        )
                        .await
                    }
                    (Err(update_err), None) => {
                        app_state
                            .views
                            .error_page(update_err.status(), Some(update_err.message()), false)
                    }
                }
            },
        ),
    )
}

/// Renders the account details and profile of the signed-in user
async fn my_page(
    session: &ActiveSession,
    action_err: Option<&ActionError>,
    ext_cxn: &impl ExternalConnectivity,
    profile_service: &impl ProfilePort,
    views: &Views,
) -> Response {
    let user_cxn = session.connectivity(ext_cxn);
    let profile_reader = persistence::rest_profile_driven_ports::RestProfileReader;

    let profile = match profile_service
        .get_profile(session.identity.id, &user_cxn, &profile_reader)
        .await
    {
        Ok(profile) => profile,
        Err(profile_err) => {
            warn!("Could not load profile, showing account details only: {profile_err:#}");
            None
        }
    };

    let mut context = Views::context(true);
    context.insert("profile", &dto::ProfileView::new(&session.identity, profile.as_ref()));
    context.insert("error", &action_err.map(ActionError::message));
    match action_err {
        Some(action_err) => views.render_with_status(action_err.status(), "mypage.html", &context),
        None => views.render("mypage.html", &context),
    }
}

/// Renames the signed-in user
async fn update_profile(
    session: Option<&ActiveSession>,
    form: &dto::ProfileForm,
    ext_cxn: &impl ExternalConnectivity,
    profile_service: &impl ProfilePort,
) -> Result<ActionRedirect, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!(user_id = %session.identity.id, "Updating profile");
    let user_cxn = session.connectivity(ext_cxn);
    let profile_writer = persistence::rest_profile_driven_ports::RestProfileWriter;

    let update_result = profile_service
        .update_name(session.identity.id, &form.name, &user_cxn, &profile_writer)
        .await;
    match update_result {
        Ok(()) => Ok(ActionRedirect::to("/mypage", &["/mypage"])),
        Err(ProfileError::NotFound) => Err(ActionError::not_found(UPDATE_FAILED)),
        Err(ProfileError::PortError(cause)) => {
            error!("Profile update failure: {cause:#}");
            Err(ActionError::failed(UPDATE_FAILED))
        }
    }
}
