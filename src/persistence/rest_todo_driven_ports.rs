use super::{eq, successful, table_request};
use crate::domain;
use crate::domain::todo::{NewTask, TaskListQuery, TaskStatus, TodoTask, UpdateTask};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

const TODOS: &str = "todos";

#[derive(Deserialize)]
struct TodoRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TodoRow> for TodoTask {
    fn from(value: TodoRow) -> Self {
        let status = TaskStatus::from_label(&value.status).unwrap_or_else(|| {
            warn!(task_id = %value.id, status = %value.status, "Task has an unknown status, treating it as incomplete");
            TaskStatus::default()
        });

        TodoTask {
            id: value.id,
            owner_user_id: value.user_id,
            title: value.title,
            content: value.content,
            status,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize)]
struct InsertTodoRow<'a> {
    user_id: Uuid,
    title: &'a str,
    content: Option<&'a str>,
    status: &'static str,
}

#[derive(Serialize)]
struct UpdateTodoRow<'a> {
    title: &'a str,
    content: Option<&'a str>,
    status: &'static str,
    updated_at: DateTime<Utc>,
}

/// Utility DTO for reading back the ID of an inserted or touched row
#[derive(Deserialize)]
struct RowId {
    id: Uuid,
}

/// Query parameters selecting one task, scoped to its owner
fn owned_task_filter(user_id: Uuid, task_id: Uuid) -> [(&'static str, String); 2] {
    [("id", eq(task_id)), ("user_id", eq(user_id))]
}

/// Query parameters for listing a user's tasks with the requested filter and order
fn list_params(user_id: Uuid, query: &TaskListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_owned()), ("user_id", eq(user_id))];
    if let Some(status) = query.status {
        params.push(("status", eq(status.label())));
    }
    params.push((
        "order",
        format!("{}.{}", query.sort.column_name(), query.order.as_str()),
    ));

    params
}

pub struct RestTaskReader;

impl domain::todo::driven_ports::TaskReader for RestTaskReader {
    async fn tasks_for_user(
        &self,
        user_id: Uuid,
        query: &TaskListQuery,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Vec<TodoTask>, Error> {
        let response = table_request(ext_cxn, Method::GET, TODOS)?
            .query(&list_params(user_id, query))
            .send()
            .await
            .context("requesting a user's tasks")?;
        let rows: Vec<TodoRow> = successful(response, "listing tasks")
            .await?
            .json()
            .await
            .context("decoding a user's tasks")?;

        Ok(rows.into_iter().map(TodoTask::from).collect())
    }

    async fn user_task_by_id(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<TodoTask>, Error> {
        let response = table_request(ext_cxn, Method::GET, TODOS)?
            .query(&[("select", "*")])
            .query(&owned_task_filter(user_id, task_id))
            .send()
            .await
            .context("requesting a task by ID")?;
        let rows: Vec<TodoRow> = successful(response, "fetching a task")
            .await?
            .json()
            .await
            .context("decoding a task")?;

        Ok(rows.into_iter().next().map(TodoTask::from))
    }
}

pub struct RestTaskWriter;

impl domain::todo::driven_ports::TaskWriter for RestTaskWriter {
    async fn create_task_for_user(
        &self,
        user_id: Uuid,
        task: &NewTask,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Uuid, Error> {
        let response = table_request(ext_cxn, Method::POST, TODOS)?
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .json(&InsertTodoRow {
                user_id,
                title: &task.title,
                content: task.content.as_deref(),
                status: task.status.label(),
            })
            .send()
            .await
            .context("inserting a task")?;
        let inserted: Vec<RowId> = successful(response, "creating a task")
            .await?
            .json()
            .await
            .context("decoding an inserted task's ID")?;

        inserted
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| anyhow!("task insert returned no rows"))
    }

    async fn update_user_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let response = table_request(ext_cxn, Method::PATCH, TODOS)?
            .header("Prefer", "return=representation")
            .query(&owned_task_filter(user_id, task_id))
            .query(&[("select", "id")])
            .json(&UpdateTodoRow {
                title: &update.title,
                content: update.content.as_deref(),
                status: update.status.label(),
                updated_at: Utc::now(),
            })
            .send()
            .await
            .context("updating a task")?;
        let touched: Vec<RowId> = successful(response, "updating a task")
            .await?
            .json()
            .await
            .context("decoding updated task IDs")?;

        Ok(!touched.is_empty())
    }

    async fn delete_user_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let response = table_request(ext_cxn, Method::DELETE, TODOS)?
            .header("Prefer", "return=representation")
            .query(&owned_task_filter(user_id, task_id))
            .query(&[("select", "id")])
            .send()
            .await
            .context("deleting a task")?;
        let deleted: Vec<RowId> = successful(response, "deleting a task")
            .await?
            .json()
            .await
            .context("decoding deleted task IDs")?;

        Ok(!deleted.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::todo::driven_ports::{TaskReader, TaskWriter};
    use crate::domain::todo::{SortColumn, SortOrder};
    use crate::persistence;
    use serde_json::json;
    use speculoos::prelude::*;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWNER: Uuid = Uuid::from_u128(0x1001);
    const TASK: Uuid = Uuid::from_u128(0x2001);

    fn backend_at(server: &MockServer) -> persistence::ExternalConnectivity {
        persistence::ExternalConnectivity::new(
            Url::parse(&server.uri()).expect("mock server URI is valid"),
            "anon-key",
        )
        .expect("client builds")
        .acting_as("user-token")
    }

    fn task_row(status: &str) -> serde_json::Value {
        json!({
            "id": TASK,
            "user_id": OWNER,
            "title": "Buy milk",
            "content": null,
            "status": status,
            "created_at": "2024-04-01T09:00:00.000000+00:00",
            "updated_at": "2024-04-01T09:30:00+00:00"
        })
    }

    #[test]
    fn list_params_default_to_newest_first() {
        let params = list_params(OWNER, &TaskListQuery::default());

        assert_that!(params).is_equal_to(vec![
            ("select", "*".to_owned()),
            ("user_id", format!("eq.{OWNER}")),
            ("order", "created_at.desc".to_owned()),
        ]);
    }

    #[test]
    fn list_params_include_status_and_order() {
        let query = TaskListQuery {
            status: Some(TaskStatus::InProgress),
            sort: SortColumn::Title,
            order: SortOrder::Asc,
        };
        let params = list_params(OWNER, &query);

        assert_that!(params).contains(("status", "eq.途中".to_owned()));
        assert_that!(params).contains(("order", "title.asc".to_owned()));
    }

    #[tokio::test]
    async fn lists_tasks_as_the_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(query_param("user_id", format!("eq.{OWNER}")))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row("完了")])))
            .expect(1)
            .mount(&server)
            .await;

        let tasks = RestTaskReader
            .tasks_for_user(OWNER, &TaskListQuery::default(), &backend_at(&server))
            .await;
        assert_that!(tasks).is_ok().matches(|tasks| {
            matches!(tasks.as_slice(), [task] if task.status == TaskStatus::Complete && task.title == "Buy milk")
        });
    }

    #[tokio::test]
    async fn unknown_status_reads_as_incomplete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row("保留")])))
            .mount(&server)
            .await;

        let task = RestTaskReader
            .user_task_by_id(OWNER, TASK, &backend_at(&server))
            .await;
        assert_that!(task)
            .is_ok()
            .is_some()
            .matches(|task| task.status == TaskStatus::Incomplete);
    }

    #[tokio::test]
    async fn missing_task_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", format!("eq.{TASK}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let task = RestTaskReader
            .user_task_by_id(OWNER, TASK, &backend_at(&server))
            .await;
        assert_that!(task).is_ok().is_none();
    }

    #[tokio::test]
    async fn creates_task_with_label_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/todos"))
            .and(header("prefer", "return=representation"))
            .and(body_partial_json(json!({
                "user_id": OWNER,
                "title": "Buy milk",
                "content": null,
                "status": "未完了"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": TASK }])))
            .expect(1)
            .mount(&server)
            .await;

        let created = RestTaskWriter
            .create_task_for_user(
                OWNER,
                &NewTask {
                    title: "Buy milk".to_owned(),
                    content: None,
                    status: TaskStatus::Incomplete,
                },
                &backend_at(&server),
            )
            .await;
        assert_that!(created).is_ok_containing(TASK);
    }

    #[tokio::test]
    async fn update_touching_no_rows_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", format!("eq.{TASK}")))
            .and(query_param("user_id", format!("eq.{OWNER}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let updated = RestTaskWriter
            .update_user_task(
                OWNER,
                TASK,
                &UpdateTask {
                    title: "Buy milk".to_owned(),
                    content: Some("2 bottles".to_owned()),
                    status: TaskStatus::Complete,
                },
                &backend_at(&server),
            )
            .await;
        assert_that!(updated).is_ok_containing(false);
    }

    #[tokio::test]
    async fn backend_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let deleted = RestTaskWriter
            .delete_user_task(OWNER, TASK, &backend_at(&server))
            .await;
        assert_that!(deleted).is_err();
    }
}
