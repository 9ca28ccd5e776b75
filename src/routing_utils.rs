use axum::extract::rejection::JsonRejection;
use axum::http::header::LOCATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};
use axum_macros::FromRequest;
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, warn};
use utoipa::{ToResponse, ToSchema};
use validator::ValidationErrors;

/// Header listing the pages whose rendered output went stale because of a mutation
pub const REVALIDATE_PATHS_HEADER: HeaderName = HeaderName::from_static("x-revalidate-paths");

const UNAUTHENTICATED: &str = "ユーザー認証に失敗しました";
const INVALID_INPUT: &str = "入力内容に誤りがあります";

/// Body of every failed action
#[derive(Serialize, Debug, ToSchema, ToResponse)]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq))]
#[response(examples(
    ("Unauthenticated" = (
        summary = "No valid session came with the request (401)",
        value = json!({ "error": "ユーザー認証に失敗しました" })
    )),
    ("Not Found" = (
        summary = "The task is missing or owned by someone else (404)",
        value = json!({ "error": "TODOが見つからないか、アクセス権限がありません" })
    )),
    ("Internal Failure" = (
        summary = "The backend could not complete the request (500)",
        value = json!({ "error": "コメントの追加に失敗しました" })
    ))
))]
pub struct ActionErrorBody {
    pub error: String,
}

/// A mutation or API call that failed, carrying the message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    status: StatusCode,
    message: String,
}

impl ActionError {
    pub fn unauthenticated() -> Self {
        ActionError {
            status: StatusCode::UNAUTHORIZED,
            message: UNAUTHENTICATED.to_owned(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ActionError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ActionError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ActionError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// A validation failure reporting the first problem among `field_order`
    pub fn from_validation(errors: &ValidationErrors, field_order: &[&str]) -> Self {
        Self::invalid(first_validation_message(errors, field_order))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> ActionErrorBody {
        ActionErrorBody {
            error: self.message.clone(),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(ActionErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Picks the message of the first failing field, checking fields in the given order
pub fn first_validation_message(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let field_errors = errors.field_errors();
    field_order
        .iter()
        .filter_map(|field| field_errors.get(field))
        .flat_map(|errs| errs.iter())
        .find_map(|error| error.message.as_ref())
        .map(|message| message.to_string())
        .unwrap_or_else(|| INVALID_INPUT.to_owned())
}

/// Marks pages as stale so caches in front of the app recompute them on next access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidatePaths(pub Vec<String>);

impl IntoResponseParts for RevalidatePaths {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let joined = self.0.join(", ");
        debug!(paths = %joined, "Revalidating pages");
        match HeaderValue::from_str(&joined) {
            Ok(header_value) => {
                res.headers_mut()
                    .insert(REVALIDATE_PATHS_HEADER, header_value);
            }
            Err(header_err) => warn!("Revalidated paths could not be sent as a header: {header_err}"),
        }

        Ok(res)
    }
}

/// Successful form submission: marks pages stale, then sends the browser on with a 303
#[derive(Debug, PartialEq, Eq)]
pub struct ActionRedirect {
    pub location: String,
    pub revalidated: RevalidatePaths,
}

impl ActionRedirect {
    pub fn to(location: impl Into<String>, revalidated: &[&str]) -> Self {
        ActionRedirect {
            location: location.into(),
            revalidated: RevalidatePaths(revalidated.iter().map(|path| path.to_string()).collect()),
        }
    }
}

impl IntoResponse for ActionRedirect {
    fn into_response(self) -> Response {
        let location = match HeaderValue::from_str(&self.location) {
            Ok(location) => location,
            Err(_) => HeaderValue::from_static("/"),
        };

        (StatusCode::SEE_OTHER, self.revalidated, [(LOCATION, location)]).into_response()
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for action errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        debug!("Rejected request body: {}", self.parse_problem);
        ActionError::invalid(INVALID_INPUT).into_response()
    }
}
