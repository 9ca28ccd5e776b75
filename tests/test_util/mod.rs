use axum::Router;
use axum::body::{self, Body};
use axum::http::Response;
use serde_json::{Value, json};
use std::sync::Arc;
use todo_web::config::AppConfig;
use todo_web::views::Views;
use todo_web::{SharedData, build_router, persistence};
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_ID: Uuid = Uuid::from_u128(0x1001);
pub const TASK_ID: Uuid = Uuid::from_u128(0x2001);

/// Builds the whole app, pointed at a fake backend
pub fn app_against(backend: &MockServer) -> Router {
    let backend_url = Url::parse(&backend.uri()).expect("mock server URI is a URL");
    let config = AppConfig {
        supabase_url: backend_url.clone(),
        supabase_anon_key: "anon-key".to_owned(),
        site_url: Url::parse("http://localhost:8080").expect("static URL is valid"),
        bind_address: "127.0.0.1:0".parse().expect("static address is valid"),
        otel_span_export_url: None,
        otel_metric_export_url: None,
    };
    let ext_cxn = persistence::ExternalConnectivity::new(backend_url, &config.supabase_anon_key)
        .expect("backend client builds");
    let views = Views::new().expect("templates compile");

    build_router(Arc::new(SharedData {
        ext_cxn,
        config,
        views,
    }))
}

pub fn user_json() -> Value {
    json!({ "id": USER_ID, "email": "hanako@example.com" })
}

pub fn session_json(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json(),
    })
}

/// Makes the backend accept `access_token` as belonging to the test user
pub async fn accept_access_token(backend: &MockServer, access_token: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(backend)
        .await;
}

pub fn todo_row(title: &str, status: &str) -> Value {
    json!({
        "id": TASK_ID,
        "user_id": USER_ID,
        "title": title,
        "content": null,
        "status": status,
        "created_at": "2024-04-01T09:00:00Z",
        "updated_at": "2024-04-01T09:30:00Z",
    })
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body is readable");
    String::from_utf8(bytes.to_vec()).expect("response body is UTF-8")
}

pub fn header_text<'r>(response: &'r Response<Body>, name: &str) -> Option<&'r str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}
