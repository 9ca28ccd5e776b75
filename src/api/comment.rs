use crate::domain::comment::CommentSubscription;
use crate::domain::comment::driving_ports::{CommentError, CommentPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ActionError, ActionErrorBody, Json, RevalidatePaths};
use crate::session::{ActiveSession, MaybeSignedIn};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use futures::{Stream, StreamExt, future, stream};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

#[derive(OpenApi)]
#[openapi(paths(list_comments, add_comment, delete_comment))]
/// Defines the OpenAPI documentation for the comment API
pub struct CommentApi;
/// Constant used to group comment endpoints in OpenAPI documentation
pub const COMMENT_API_GROUP: &str = "Comments";

const TASK_NOT_FOUND: &str = "TODOが見つからないか、アクセス権限がありません";
const LIST_FAILED: &str = "コメントの取得に失敗しました";
const ADD_FAILED: &str = "コメントの追加に失敗しました";
const DELETE_FAILED: &str = "コメントの削除に失敗しました";

/// Adds the JSON comment endpoints and the live comment feed to the application router
pub fn comment_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/todos/:task_id/comments",
            get(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(task_id): Path<String>| async move {
                    let task_id = parse_task_id(&task_id)?;
                    let comment_service = domain::comment::CommentService {};

                    list_comments(session.as_ref(), task_id, &app_state.ext_cxn, &comment_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(task_id): Path<String>,
                 Json(new_comment): Json<dto::NewCommentDto>| async move {
                    let task_id = parse_task_id(&task_id)?;
                    let comment_service = domain::comment::CommentService {};

                    add_comment(
                        session.as_ref(),
                        task_id,
                        new_comment,
                        &app_state.ext_cxn,
                        &comment_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/comments/:comment_id",
            delete(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(comment_id): Path<String>| async move {
                    let comment_id = Uuid::parse_str(&comment_id)
                        .map_err(|_| ActionError::not_found(DELETE_FAILED))?;
                    let comment_service = domain::comment::CommentService {};

                    delete_comment(session.as_ref(), comment_id, &app_state.ext_cxn, &comment_service).await
                },
            ),
        )
        .route(
            "/todos/:task_id/comments/stream",
            get(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(task_id): Path<String>| async move {
                    let task_id = parse_task_id(&task_id)?;
                    let session = session.ok_or_else(ActionError::unauthenticated)?;
                    let comment_service = domain::comment::CommentService {};

                    let subscription =
                        start_comment_watch(&session, task_id, &app_state.ext_cxn, &comment_service).await?;
                    let user_id = session.identity.id;
                    let user_cxn = session.connectivity(&app_state.ext_cxn);
                    let refreshes = comment_refreshes(subscription, move || {
                        let user_cxn = user_cxn.clone();
                        async move {
                            let comment_service = domain::comment::CommentService {};
                            match load_comments(user_id, task_id, &user_cxn, &comment_service).await {
                                Ok(comments) => CommentRefresh::Comments(comments),
                                Err(load_err) => CommentRefresh::Failed(load_err.body()),
                            }
                        }
                    });

                    Ok::<_, ActionError>(
                        Sse::new(refreshes.map(CommentRefresh::into_event)).keep_alive(KeepAlive::default()),
                    )
                },
            ),
        )
}

fn parse_task_id(raw: &str) -> Result<Uuid, ActionError> {
    Uuid::parse_str(raw).map_err(|_| ActionError::not_found(TASK_NOT_FOUND))
}

/// Loads a task's comments newest first, as the current user sees them
async fn load_comments(
    user_id: Uuid,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    comment_service: &impl CommentPort,
) -> Result<Vec<dto::CommentDto>, ActionError> {
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;
    let comment_reader = persistence::rest_comment_driven_ports::RestCommentReader;

    let comments_result = comment_service
        .comments_for_task(user_id, task_id, ext_cxn, &task_reader, &comment_reader)
        .await;
    match comments_result {
        Ok(comments) => Ok(comments.into_iter().map(dto::CommentDto::from).collect()),
        Err(CommentError::TaskNotFound) => Err(ActionError::not_found(TASK_NOT_FOUND)),
        Err(list_err) => {
            error!("Could not list comments for task {task_id}: {list_err:#}");
            Err(ActionError::failed(LIST_FAILED))
        }
    }
}

#[utoipa::path(
    get,
    path = "/todos/{task_id}/comments",
    tag = COMMENT_API_GROUP,
    params(("task_id" = Uuid, Path, description = "The task the comments belong to")),
    responses(
        (status = 200, description = "The task's comments, newest first", body = [dto::CommentDto]),
        (status = 401, response = ActionErrorBody),
        (status = 404, response = ActionErrorBody),
        (status = 500, response = ActionErrorBody),
    ),
)]
/// Lists the comments on one of the current user's tasks
async fn list_comments(
    session: Option<&ActiveSession>,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    comment_service: &impl CommentPort,
) -> Result<Json<Vec<dto::CommentDto>>, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Listing comments for task {task_id}");
    let user_cxn = session.connectivity(ext_cxn);

    let comments = load_comments(session.identity.id, task_id, &user_cxn, comment_service).await?;
    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/todos/{task_id}/comments",
    tag = COMMENT_API_GROUP,
    params(("task_id" = Uuid, Path, description = "The task to comment on")),
    request_body = dto::NewCommentDto,
    responses(
        (status = 201, description = "Comment added", body = dto::InsertedComment),
        (status = 204, description = "The comment was blank, so nothing was added"),
        (status = 400, response = ActionErrorBody),
        (status = 401, response = ActionErrorBody),
        (status = 404, response = ActionErrorBody),
        (status = 500, response = ActionErrorBody),
    ),
)]
/// Adds a comment to one of the current user's tasks
async fn add_comment(
    session: Option<&ActiveSession>,
    task_id: Uuid,
    new_comment: dto::NewCommentDto,
    ext_cxn: &impl ExternalConnectivity,
    comment_service: &impl CommentPort,
) -> Result<Response, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Adding comment to task {task_id}");
    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;
    let comment_writer = persistence::rest_comment_driven_ports::RestCommentWriter;

    let domain_comment = domain::comment::NewComment::from(new_comment);
    let add_result = comment_service
        .add_comment(
            session.identity.id,
            task_id,
            &domain_comment,
            &user_cxn,
            &task_reader,
            &comment_writer,
        )
        .await;
    let task_path = format!("/todos/{task_id}");
    match add_result {
        Ok(Some(id)) => Ok((
            StatusCode::CREATED,
            RevalidatePaths(vec![task_path]),
            Json(dto::InsertedComment { id }),
        )
            .into_response()),
        Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(CommentError::TaskNotFound) => Err(ActionError::not_found(TASK_NOT_FOUND)),
        Err(add_err) => {
            error!("Comment create failure: {add_err:#}");
            Err(ActionError::failed(ADD_FAILED))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/comments/{comment_id}",
    tag = COMMENT_API_GROUP,
    params(("comment_id" = Uuid, Path, description = "The comment to delete")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, response = ActionErrorBody),
        (status = 404, response = ActionErrorBody),
        (status = 500, response = ActionErrorBody),
    ),
)]
/// Deletes a comment the current user wrote
async fn delete_comment(
    session: Option<&ActiveSession>,
    comment_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    comment_service: &impl CommentPort,
) -> Result<StatusCode, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Deleting comment {comment_id}");
    let user_cxn = session.connectivity(ext_cxn);
    let comment_writer = persistence::rest_comment_driven_ports::RestCommentWriter;

    let delete_result = comment_service
        .delete_comment(session.identity.id, comment_id, &user_cxn, &comment_writer)
        .await;
    match delete_result {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(CommentError::CommentNotFound) => Err(ActionError::not_found(DELETE_FAILED)),
        Err(delete_err) => {
            error!("Failed to delete comment: {delete_err:#}");
            Err(ActionError::failed(DELETE_FAILED))
        }
    }
}

/// Subscribes to comment changes on one of the current user's tasks. If the realtime feed is
/// unavailable the caller still gets [None] so the current list can be served without live updates.
async fn start_comment_watch(
    session: &ActiveSession,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    comment_service: &impl CommentPort,
) -> Result<Option<CommentSubscription>, ActionError> {
    info!("Opening comment feed for task {task_id}");
    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;
    let feed = persistence::realtime_comment_feed::RealtimeCommentFeed;

    let watch_result = comment_service
        .watch_comments(session.identity.id, task_id, &user_cxn, &task_reader, &feed)
        .await;
    match watch_result {
        Ok(subscription) => Ok(Some(subscription)),
        Err(CommentError::TaskNotFound) => Err(ActionError::not_found(TASK_NOT_FOUND)),
        Err(watch_err) => {
            warn!("Live comment updates unavailable for task {task_id}: {watch_err:#}");
            Ok(None)
        }
    }
}

/// One push on the live comment feed
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
enum CommentRefresh {
    Comments(Vec<dto::CommentDto>),
    Failed(ActionErrorBody),
}

impl CommentRefresh {
    fn into_event(self) -> Result<Event, axum::Error> {
        match self {
            CommentRefresh::Comments(comments) => Event::default().event("comments").json_data(comments),
            CommentRefresh::Failed(body) => Event::default().event("comments_error").json_data(body),
        }
    }
}

/// Emits the full comment list once up front and again after every change on the subscription.
/// The stream ends when the feed shuts down, and dropping it releases the subscription. Without a
/// subscription only the initial list is sent and the connection then stays idle.
fn comment_refreshes<L, F>(
    subscription: Option<CommentSubscription>,
    load: L,
) -> impl Stream<Item = CommentRefresh>
where
    L: FnMut() -> F,
    F: Future<Output = CommentRefresh>,
{
    stream::unfold(
        (subscription, load, true),
        |(mut subscription, mut load, first)| async move {
            if !first {
                match subscription.as_mut() {
                    Some(subscription) => {
                        let change = subscription.next_change().await?;
                        debug!(?change, "Comments changed, reloading");
                    }
                    None => future::pending::<()>().await,
                }
            }
            let refresh = load().await;

            Some((refresh, (subscription, load, false)))
        },
    )
}
