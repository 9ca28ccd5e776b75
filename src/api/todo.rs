use crate::domain::todo::TaskStatus;
use crate::domain::todo::driving_ports::{TaskError, TaskPort};
use crate::dto::{TaskFormValues, TaskListFilters, TaskView};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ActionError, ActionRedirect};
use crate::session::{ActiveSession, MaybeSignedIn, SignedIn};
use crate::views::Views;
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

const TASK_NOT_FOUND: &str = "TODOが見つからないか、アクセス権限がありません";

/// Adds the task pages and the form actions behind them to the application router
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/todos",
            get(
                |State(app_state): AppState,
                 SignedIn(session): SignedIn,
                 Query(params): Query<dto::TaskListParams>| async move {
                    let task_service = domain::todo::TaskService {};

                    task_list_page(&session, &params, &app_state.ext_cxn, &task_service, &app_state.views).await
                },
            ),
        )
        .route(
            "/todos/create",
            get(|State(app_state): AppState, SignedIn(_): SignedIn| async move {
                task_form_page(
                    &app_state.views,
                    &TaskFormPage::create(),
                    &TaskFormValues::default(),
                    None,
                    true,
                )
            })
            .post(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Form(form): Form<dto::TaskForm>| async move {
                    let task_service = domain::todo::TaskService {};

                    match create_task(session.as_ref(), &form, &app_state.ext_cxn, &task_service).await {
                        Ok(redirect) => redirect.into_response(),
                        Err(action_err) => task_form_page(
                            &app_state.views,
                            &TaskFormPage::create(),
                            &TaskFormValues::from(&form),
                            Some(&action_err),
                            session.is_some(),
                        ),
                    }
                },
            ),
        )
        .route(
            "/todos/:task_id",
            get(
                |State(app_state): AppState,
                 SignedIn(session): SignedIn,
                 Path(task_id): Path<String>| async move {
                    let Ok(task_id) = Uuid::parse_str(&task_id) else {
                        return app_state.views.not_found(true);
                    };
                    let task_service = domain::todo::TaskService {};

                    task_detail_page(&session, task_id, &app_state.ext_cxn, &task_service, &app_state.views).await
                },
            ),
        )
        .route(
            "/todos/:task_id/edit",
            get(
                |State(app_state): AppState,
                 SignedIn(session): SignedIn,
                 Path(task_id): Path<String>| async move {
                    let Ok(task_id) = Uuid::parse_str(&task_id) else {
                        return app_state.views.not_found(true);
                    };
                    let task_service = domain::todo::TaskService {};

                    edit_task_page(&session, task_id, &app_state.ext_cxn, &task_service, &app_state.views).await
                },
            )
            .post(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(task_id): Path<String>,
                 Form(form): Form<dto::TaskForm>| async move {
                    let Ok(task_id) = Uuid::parse_str(&task_id) else {
                        return app_state.views.not_found(session.is_some());
                    };
                    let task_service = domain::todo::TaskService {};

                    match update_task(session.as_ref(), task_id, &form, &app_state.ext_cxn, &task_service).await {
                        Ok(redirect) => redirect.into_response(),
                        Err(action_err) => task_form_page(
                            &app_state.views,
                            &TaskFormPage::edit(task_id),
                            &TaskFormValues::from(&form),
                            Some(&action_err),
                            session.is_some(),
                        ),
                    }
                },
            ),
        )
        .route(
            "/todos/:task_id/delete",
            post(
                |State(app_state): AppState,
                 MaybeSignedIn(session): MaybeSignedIn,
                 Path(task_id): Path<String>| async move {
                    let Ok(task_id) = Uuid::parse_str(&task_id) else {
                        return app_state.views.not_found(session.is_some());
                    };
                    let task_service = domain::todo::TaskService {};

                    match delete_task(session.as_ref(), task_id, &app_state.ext_cxn, &task_service).await {
                        Ok(redirect) => redirect.into_response(),
                        Err(action_err) => app_state.views.error_page(
                            action_err.status(),
                            Some(action_err.message()),
                            session.is_some(),
                        ),
                    }
                },
            ),
        )
}

/// Labels and targets that differ between the create and edit forms
struct TaskFormPage {
    heading: &'static str,
    action: String,
    submit_label: &'static str,
    cancel_href: String,
}

impl TaskFormPage {
    fn create() -> Self {
        TaskFormPage {
            heading: "新規TODO作成",
            action: "/todos/create".to_owned(),
            submit_label: "TODOを作成",
            cancel_href: "/todos".to_owned(),
        }
    }

    fn edit(task_id: Uuid) -> Self {
        TaskFormPage {
            heading: "TODO編集",
            action: format!("/todos/{task_id}/edit"),
            submit_label: "更新する",
            cancel_href: format!("/todos/{task_id}"),
        }
    }
}

fn task_form_page(
    views: &Views,
    page: &TaskFormPage,
    values: &TaskFormValues,
    action_err: Option<&ActionError>,
    signed_in: bool,
) -> Response {
    let mut context = Views::context(signed_in);
    context.insert("heading", page.heading);
    context.insert("action", &page.action);
    context.insert("submit_label", page.submit_label);
    context.insert("cancel_href", &page.cancel_href);
    context.insert("values", values);
    context.insert("statuses", &TaskStatus::ALL.map(TaskStatus::label));
    context.insert("error", &action_err.map(ActionError::message));

    let status = action_err.map_or(StatusCode::OK, ActionError::status);
    views.render_with_status(status, "task_form.html", &context)
}

/// Renders the user's task list, filtered and sorted by the query string
async fn task_list_page(
    session: &ActiveSession,
    params: &dto::TaskListParams,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
    views: &Views,
) -> Response {
    let query = domain::todo::TaskListQuery::from(params);
    info!(user_id = %session.identity.id, ?query, "Listing tasks");
    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;

    let tasks_result = task_service
        .tasks_for_user(session.identity.id, &query, &user_cxn, &task_reader)
        .await;
    let mut context = Views::context(true);
    context.insert("filters", &TaskListFilters::from(&query));
    match tasks_result {
        Ok(tasks) => {
            let task_views: Vec<TaskView> = tasks.into_iter().map(TaskView::from).collect();
            context.insert("tasks", &task_views);
            views.render("todos.html", &context)
        }
        Err(list_err) => {
            error!("Could not list tasks: {list_err:#}");
            context.insert("tasks", &Vec::<TaskView>::new());
            context.insert("error", "TODOの取得に失敗しました");
            views.render_with_status(StatusCode::INTERNAL_SERVER_ERROR, "todos.html", &context)
        }
    }
}

/// Renders one task with its comment section
async fn task_detail_page(
    session: &ActiveSession,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
    views: &Views,
) -> Response {
    info!(%task_id, "Showing task");
    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;

    let task_result = task_service
        .user_task_by_id(session.identity.id, task_id, &user_cxn, &task_reader)
        .await;
    match task_result {
        Ok(task) => {
            let mut context = Views::context(true);
            context.insert("task", &TaskView::from(task));
            context.insert("current_user_id", &session.identity.id);
            views.render("task_detail.html", &context)
        }
        Err(TaskError::NotFound) => views.not_found(true),
        Err(TaskError::PortError(cause)) => {
            error!("Could not fetch task {task_id}: {cause:#}");
            views.error_page(StatusCode::INTERNAL_SERVER_ERROR, None, true)
        }
    }
}

/// Renders the edit form filled in with the task's current values
async fn edit_task_page(
    session: &ActiveSession,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
    views: &Views,
) -> Response {
    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;

    let task_result = task_service
        .user_task_by_id(session.identity.id, task_id, &user_cxn, &task_reader)
        .await;
    match task_result {
        Ok(task) => task_form_page(
            views,
            &TaskFormPage::edit(task_id),
            &TaskFormValues::from(&task),
            None,
            true,
        ),
        Err(TaskError::NotFound) => views.not_found(true),
        Err(TaskError::PortError(cause)) => {
            error!("Could not fetch task {task_id} for editing: {cause:#}");
            views.error_page(StatusCode::INTERNAL_SERVER_ERROR, None, true)
        }
    }
}

/// Creates a task for the signed-in user
async fn create_task(
    session: Option<&ActiveSession>,
    form: &dto::TaskForm,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<ActionRedirect, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Creating task {form}");
    form.validate()
        .map_err(|errs| ActionError::from_validation(&errs, &dto::TASK_FORM_FIELDS))?;

    let user_cxn = session.connectivity(ext_cxn);
    let task_writer = persistence::rest_todo_driven_ports::RestTaskWriter;
    let new_task = domain::todo::NewTask::from(form);
    let create_result = task_service
        .create_task_for_user(session.identity.id, &new_task, &user_cxn, &task_writer)
        .await;
    if let Err(create_err) = create_result {
        error!("Task create failure: {create_err:#}");
        return Err(ActionError::failed("TODOの作成に失敗しました"));
    }

    Ok(ActionRedirect::to("/todos", &["/todos"]))
}

/// Rewrites one of the signed-in user's tasks
async fn update_task(
    session: Option<&ActiveSession>,
    task_id: Uuid,
    form: &dto::TaskForm,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<ActionRedirect, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Updating task {task_id}");
    form.validate()
        .map_err(|errs| ActionError::from_validation(&errs, &dto::TASK_FORM_FIELDS))?;

    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;
    let task_writer = persistence::rest_todo_driven_ports::RestTaskWriter;
    let update = domain::todo::UpdateTask::from(form);
    let update_result = task_service
        .update_task(
            session.identity.id,
            task_id,
            &update,
            &user_cxn,
            &task_reader,
            &task_writer,
        )
        .await;
    match update_result {
        Ok(()) => {
            let task_path = format!("/todos/{task_id}");
            Ok(ActionRedirect::to(task_path.clone(), &[&task_path, "/todos"]))
        }
        Err(TaskError::NotFound) => Err(ActionError::not_found(TASK_NOT_FOUND)),
        Err(TaskError::PortError(cause)) => {
            error!("Update task failure: {cause:#}");
            Err(ActionError::failed("TODOの更新に失敗しました"))
        }
    }
}

/// Deletes one of the signed-in user's tasks along with its comments
async fn delete_task(
    session: Option<&ActiveSession>,
    task_id: Uuid,
    ext_cxn: &impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<ActionRedirect, ActionError> {
    let session = session.ok_or_else(ActionError::unauthenticated)?;
    info!("Deleting task {task_id}");

    let user_cxn = session.connectivity(ext_cxn);
    let task_reader = persistence::rest_todo_driven_ports::RestTaskReader;
    let task_writer = persistence::rest_todo_driven_ports::RestTaskWriter;
    let comment_writer = persistence::rest_comment_driven_ports::RestCommentWriter;
    let delete_result = task_service
        .delete_task(
            session.identity.id,
            task_id,
            &user_cxn,
            &task_reader,
            &task_writer,
            &comment_writer,
        )
        .await;
    match delete_result {
        Ok(()) => {
            let task_path = format!("/todos/{task_id}");
            Ok(ActionRedirect::to("/todos", &["/todos", &task_path]))
        }
        Err(TaskError::NotFound) => Err(ActionError::not_found(TASK_NOT_FOUND)),
        Err(TaskError::PortError(cause)) => {
            error!("Failed to delete task: {cause:#}");
            Err(ActionError::failed("削除に失敗しました"))
        }
    }
}
