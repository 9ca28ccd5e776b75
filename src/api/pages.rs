use crate::session::MaybeSignedIn;
use crate::{AppState, SharedData};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use std::sync::Arc;

/// Adds the landing redirect and the generic error page to the application router
pub fn page_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(|MaybeSignedIn(session): MaybeSignedIn| async move { landing_redirect(session.is_some()) }),
        )
        .route(
            "/error",
            get(|State(app_state): AppState, MaybeSignedIn(session): MaybeSignedIn| async move {
                app_state
                    .views
                    .error_page(StatusCode::OK, None, session.is_some())
            }),
        )
}

/// Renders the not found page for any path no route matched
pub async fn not_found(State(app_state): AppState, MaybeSignedIn(session): MaybeSignedIn) -> Response {
    app_state.views.not_found(session.is_some())
}

fn landing_redirect(signed_in: bool) -> Response {
    if signed_in {
        Redirect::to("/todos").into_response()
    } else {
        Redirect::to("/signin").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;
    use speculoos::prelude::*;

    #[test]
    fn landing_depends_on_session() {
        let signed_in = landing_redirect(true);
        let anonymous = landing_redirect(false);

        assert_that!(signed_in.headers().get(LOCATION).and_then(|v| v.to_str().ok()))
            .is_equal_to(Some("/todos"));
        assert_that!(anonymous.headers().get(LOCATION).and_then(|v| v.to_str().ok()))
            .is_equal_to(Some("/signin"));
    }
}
