use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// DTO for a comment returned on the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct CommentDto {
    pub id: Uuid,
    pub todo_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Picked up the milk on the way home")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<domain::comment::TaskComment> for CommentDto {
    fn from(value: domain::comment::TaskComment) -> Self {
        CommentDto {
            id: value.id,
            todo_id: value.task_id,
            user_id: value.author_user_id,
            content: value.content,
            created_at: value.created_at,
        }
    }
}

/// DTO for posting a comment via the API
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewCommentDto {
    #[schema(example = "Picked up the milk on the way home")]
    pub content: String,
}

impl From<NewCommentDto> for domain::comment::NewComment {
    fn from(value: NewCommentDto) -> Self {
        domain::comment::NewComment {
            content: value.content,
        }
    }
}

/// DTO containing the ID of a comment that was created via the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct InsertedComment {
    pub id: Uuid,
}
