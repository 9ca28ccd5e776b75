use crate::config::AppConfig;
use crate::views::Views;
use axum::extract::State;
use axum::{Router, middleware};
use std::sync::Arc;

pub mod api;
mod app_env;
pub mod config;
mod domain;
mod dto;
mod external_connections;
pub mod logging;
pub mod persistence;
mod routing_utils;
mod session;
pub mod views;

/// Process-wide state every request handler can reach
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub config: AppConfig,
    pub views: Views,
}

pub type AppState = State<Arc<SharedData>>;

/// Assembles every route of the app. Requests pass through the session middleware (except for the
/// API documentation) and the request tracing layer.
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let app_routes = Router::new()
        .merge(api::pages::page_routes())
        .merge(api::auth::auth_routes())
        .merge(api::todo::task_routes())
        .merge(api::comment::comment_routes())
        .merge(api::profile::profile_routes())
        .fallback(api::pages::not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&shared_data),
            session::resolve_session,
        ))
        .merge(api::swagger_main::build_documentation())
        .with_state(shared_data);

    logging::attach_tracing_http(app_routes)
}
