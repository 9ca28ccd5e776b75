use super::{eq, successful, table_request};
use crate::domain;
use crate::domain::comment::TaskComment;
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COMMENTS: &str = "comments";

#[derive(Deserialize)]
struct CommentRow {
    id: Uuid,
    todo_id: Uuid,
    user_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for TaskComment {
    fn from(value: CommentRow) -> Self {
        TaskComment {
            id: value.id,
            task_id: value.todo_id,
            author_user_id: value.user_id,
            content: value.content,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize)]
struct InsertCommentRow<'a> {
    todo_id: Uuid,
    user_id: Uuid,
    content: &'a str,
}

#[derive(Deserialize)]
struct RowId {
    id: Uuid,
}

pub struct RestCommentReader;

impl domain::comment::driven_ports::CommentReader for RestCommentReader {
    async fn comments_for_task(
        &self,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Vec<TaskComment>, Error> {
        let response = table_request(ext_cxn, Method::GET, COMMENTS)?
            .query(&[
                ("select", "*".to_owned()),
                ("todo_id", eq(task_id)),
                ("order", "created_at.desc".to_owned()),
            ])
            .send()
            .await
            .context("requesting a task's comments")?;
        let rows: Vec<CommentRow> = successful(response, "listing comments")
            .await?
            .json()
            .await
            .context("decoding a task's comments")?;

        Ok(rows.into_iter().map(TaskComment::from).collect())
    }
}

pub struct RestCommentWriter;

impl domain::comment::driven_ports::CommentWriter for RestCommentWriter {
    async fn create_comment(
        &self,
        task_id: Uuid,
        author_user_id: Uuid,
        content: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Uuid, Error> {
        let response = table_request(ext_cxn, Method::POST, COMMENTS)?
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .json(&InsertCommentRow {
                todo_id: task_id,
                user_id: author_user_id,
                content,
            })
            .send()
            .await
            .context("inserting a comment")?;
        let inserted: Vec<RowId> = successful(response, "creating a comment")
            .await?
            .json()
            .await
            .context("decoding an inserted comment's ID")?;

        inserted
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| anyhow!("comment insert returned no rows"))
    }

    async fn delete_user_comment(
        &self,
        author_user_id: Uuid,
        comment_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let response = table_request(ext_cxn, Method::DELETE, COMMENTS)?
            .header("Prefer", "return=representation")
            .query(&[
                ("id", eq(comment_id)),
                ("user_id", eq(author_user_id)),
                ("select", "id".to_owned()),
            ])
            .send()
            .await
            .context("deleting a comment")?;
        let deleted: Vec<RowId> = successful(response, "deleting a comment")
            .await?
            .json()
            .await
            .context("decoding deleted comment IDs")?;

        Ok(!deleted.is_empty())
    }

    async fn delete_comments_for_task(
        &self,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let response = table_request(ext_cxn, Method::DELETE, COMMENTS)?
            .query(&[("todo_id", eq(task_id))])
            .send()
            .await
            .context("deleting a task's comments")?;
        successful(response, "deleting a task's comments").await?;

        Ok(())
    }
}
