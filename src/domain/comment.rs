use crate::domain::comment::driven_ports::{CommentChangeFeed, CommentReader, CommentWriter};
use crate::domain::comment::driving_ports::CommentError;
use crate::domain::todo::driven_ports::TaskReader;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TaskComment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct NewComment {
    pub content: String,
}

/// Kind of row change reported by the backend's change feed
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum CommentChange {
    Inserted,
    Updated,
    Deleted,
}

/// A live subscription to changes of one task's comments.
///
/// Dropping the subscription releases it: the background connection feeding it is told to leave
/// the channel and close.
pub struct CommentSubscription {
    changes: mpsc::Receiver<CommentChange>,
    _release: oneshot::Sender<()>,
}

impl CommentSubscription {
    /// Wraps the receiving end of a change feed. The feed should stop once `release` resolves
    /// (which happens when this subscription is dropped).
    pub fn new(changes: mpsc::Receiver<CommentChange>, release: oneshot::Sender<()>) -> Self {
        CommentSubscription {
            changes,
            _release: release,
        }
    }

    /// Waits for the next change. Returns [None] once the feed has shut down.
    pub async fn next_change(&mut self) -> Option<CommentChange> {
        self.changes.recv().await
    }
}

pub mod driven_ports {
    use super::*;

    pub trait CommentReader {
        /// Every comment on the task, newest first
        async fn comments_for_task(
            &self,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Vec<TaskComment>, anyhow::Error>;
    }

    pub trait CommentWriter {
        async fn create_comment(
            &self,
            task_id: Uuid,
            author_user_id: Uuid,
            content: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Uuid, anyhow::Error>;

        /// Returns false if no comment with that ID was written by the user
        async fn delete_user_comment(
            &self,
            author_user_id: Uuid,
            comment_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        async fn delete_comments_for_task(
            &self,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }

    pub trait CommentChangeFeed {
        /// Starts listening for inserts, updates and deletes of comments on the task
        async fn subscribe(
            &self,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<CommentSubscription, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum CommentError {
        #[error("the task does not exist or is owned by another user")]
        TaskNotFound,
        #[error("the comment does not exist or was written by another user")]
        CommentNotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[cfg(test)]
    #[allow(clippy::items_after_test_module)]
    mod comment_error_clone {
        use super::CommentError;
        use anyhow::anyhow;

        impl Clone for CommentError {
            fn clone(&self) -> Self {
                match self {
                    Self::TaskNotFound => Self::TaskNotFound,
                    Self::CommentNotFound => Self::CommentNotFound,
                    Self::PortError(err) => Self::PortError(anyhow!(format!("{}", err))),
                }
            }
        }
    }

    pub trait CommentPort {
        async fn comments_for_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl TaskReader,
            comment_read: &impl driven_ports::CommentReader,
        ) -> Result<Vec<TaskComment>, CommentError>;

        /// Adds a comment to one of the user's tasks. Blank content is ignored and yields [None].
        async fn add_comment(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            comment: &NewComment,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl TaskReader,
            comment_write: &impl driven_ports::CommentWriter,
        ) -> Result<Option<Uuid>, CommentError>;

        async fn delete_comment(
            &self,
            user_id: Uuid,
            comment_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            comment_write: &impl driven_ports::CommentWriter,
        ) -> Result<(), CommentError>;

        async fn watch_comments(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl TaskReader,
            feed: &impl driven_ports::CommentChangeFeed,
        ) -> Result<CommentSubscription, CommentError>;
    }
}

pub struct CommentService {}

impl CommentService {
    async fn verify_task_owned(
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<(), CommentError> {
        task_read
            .user_task_by_id(user_id, task_id, ext_cxn)
            .await
            .context("looking up the task a comment belongs to")?
            .map(|_| ())
            .ok_or(CommentError::TaskNotFound)
    }
}

impl driving_ports::CommentPort for CommentService {
    async fn comments_for_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
        comment_read: &impl CommentReader,
    ) -> Result<Vec<TaskComment>, CommentError> {
        Self::verify_task_owned(user_id, task_id, ext_cxn, task_read).await?;

        let comments = comment_read
            .comments_for_task(task_id, ext_cxn)
            .await
            .context("listing a task's comments")?;
        Ok(comments)
    }

    async fn add_comment(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        comment: &NewComment,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
        comment_write: &impl CommentWriter,
    ) -> Result<Option<Uuid>, CommentError> {
        let content = comment.content.trim();
        if content.is_empty() {
            debug!(%task_id, "ignoring blank comment");
            return Ok(None);
        }

        Self::verify_task_owned(user_id, task_id, ext_cxn, task_read).await?;
        let comment_id = comment_write
            .create_comment(task_id, user_id, content, ext_cxn)
            .await
            .context("adding a comment")?;

        Ok(Some(comment_id))
    }

    async fn delete_comment(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        comment_write: &impl CommentWriter,
    ) -> Result<(), CommentError> {
        let deleted = comment_write
            .delete_user_comment(user_id, comment_id, ext_cxn)
            .await
            .context("deleting a comment")?;
        if !deleted {
            return Err(CommentError::CommentNotFound);
        }

        Ok(())
    }

    async fn watch_comments(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
        feed: &impl CommentChangeFeed,
    ) -> Result<CommentSubscription, CommentError> {
        Self::verify_task_owned(user_id, task_id, ext_cxn, task_read).await?;

        let subscription = feed
            .subscribe(task_id, ext_cxn)
            .await
            .context("subscribing to comment changes")?;
        Ok(subscription)
    }
}
