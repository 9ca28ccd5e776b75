mod auth;
mod comment;
mod profile;
mod task;

pub use auth::*;
pub use comment::*;
pub use profile::*;
pub use task::*;

use crate::routing_utils::ActionErrorBody;
use utoipa::OpenApi;

/// Captures OpenAPI schemas and canned responses defined in the DTO module
#[derive(OpenApi)]
#[openapi(components(
    schemas(CommentDto, NewCommentDto, InsertedComment, ActionErrorBody),
    responses(ActionErrorBody)
))]
pub struct OpenApiSchemas;
