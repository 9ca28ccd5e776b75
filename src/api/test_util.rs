use axum::body::{self, Body};
use axum::response::Response;
use serde::de::DeserializeOwned;

async fn collect_bytes(response_body: Body) -> body::Bytes {
    body::to_bytes(response_body, usize::MAX)
        .await
        .expect("response body could not be read")
}

/// Reads a JSON response body into the requested type, failing the test if the body is unreadable
/// or does not match
pub async fn deserialize_body<T: DeserializeOwned>(response_body: Body) -> T {
    let bytes = collect_bytes(response_body).await;

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!("response body did not match the expected shape: {err}, received: {bytes:?}")
    })
}

/// Reads a rendered page as text
pub async fn page_text(response: Response) -> String {
    let bytes = collect_bytes(response.into_body()).await;
    String::from_utf8(bytes.to_vec()).expect("rendered page is not UTF-8")
}
