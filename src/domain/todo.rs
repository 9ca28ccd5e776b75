use crate::domain;
use crate::domain::todo::driven_ports::{TaskReader, TaskWriter};
use crate::domain::todo::driving_ports::{TaskError, TaskPort};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Progress of a task. The backend stores these as their Japanese labels.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum TaskStatus {
    #[default]
    Incomplete,
    InProgress,
    Complete,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Incomplete,
        TaskStatus::InProgress,
        TaskStatus::Complete,
    ];

    /// The literal stored in the `status` column and shown to users
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Incomplete => "未完了",
            TaskStatus::InProgress => "途中",
            TaskStatus::Complete => "完了",
        }
    }

    pub fn from_label(label: &str) -> Option<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.label() == label)
    }

    /// Status submitted through a form. Missing or unrecognised values fall back to [TaskStatus::Incomplete].
    pub fn from_submitted(label: Option<&str>) -> TaskStatus {
        label.and_then(TaskStatus::from_label).unwrap_or_default()
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TodoTask {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct NewTask {
    pub title: String,
    pub content: Option<String>,
    pub status: TaskStatus,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct UpdateTask {
    pub title: String,
    pub content: Option<String>,
    pub status: TaskStatus,
}

/// Column the task list is ordered by
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::Title => "title",
        }
    }

    /// Unknown or missing columns sort by creation time
    pub fn from_param(column: Option<&str>) -> SortColumn {
        match column {
            Some("updated_at") => SortColumn::UpdatedAt,
            Some("title") => SortColumn::Title,
            _ => SortColumn::CreatedAt,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// Anything other than "asc" sorts descending
    pub fn from_param(order: Option<&str>) -> SortOrder {
        match order {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Filtering and ordering applied when listing a user's tasks
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub sort: SortColumn,
    pub order: SortOrder,
}

impl TaskListQuery {
    /// Interprets raw query string values. Statuses outside the known set are ignored.
    pub fn from_params(status: Option<&str>, sort: Option<&str>, order: Option<&str>) -> Self {
        TaskListQuery {
            status: status.and_then(TaskStatus::from_label),
            sort: SortColumn::from_param(sort),
            order: SortOrder::from_param(order),
        }
    }
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// Every task owned by the user, filtered and ordered as requested
        async fn tasks_for_user(
            &self,
            user_id: Uuid,
            query: &TaskListQuery,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Vec<TodoTask>, anyhow::Error>;

        /// The task with the given ID, only if it is owned by the user
        async fn user_task_by_id(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<TodoTask>, anyhow::Error>;
    }

    pub trait TaskWriter {
        async fn create_task_for_user(
            &self,
            user_id: Uuid,
            new_task: &NewTask,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Uuid, anyhow::Error>;

        /// Returns false if no task with that ID is owned by the user
        async fn update_user_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            update: &UpdateTask,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        /// Returns false if no task with that ID is owned by the user
        async fn delete_user_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("the task does not exist or is owned by another user")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait TaskPort {
        async fn tasks_for_user(
            &self,
            user_id: Uuid,
            query: &TaskListQuery,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<TodoTask>, TaskError>;
        async fn user_task_by_id(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<TodoTask, TaskError>;
        async fn create_task_for_user(
            &self,
            user_id: Uuid,
            task: &NewTask,
            ext_cxn: &impl ExternalConnectivity,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Uuid, TaskError>;
        async fn update_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            update: &UpdateTask,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<(), TaskError>;
        async fn delete_task(
            &self,
            user_id: Uuid,
            task_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
            comment_write: &impl domain::comment::driven_ports::CommentWriter,
        ) -> Result<(), TaskError>;
    }
}

pub struct TaskService {}

impl TaskPort for TaskService {
    async fn tasks_for_user(
        &self,
        user_id: Uuid,
        query: &TaskListQuery,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<TodoTask>, TaskError> {
        let tasks = task_read
            .tasks_for_user(user_id, query, ext_cxn)
            .await
            .context("listing a user's tasks")?;

        Ok(tasks)
    }

    async fn user_task_by_id(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<TodoTask, TaskError> {
        task_read
            .user_task_by_id(user_id, task_id, ext_cxn)
            .await
            .context("fetching a task by ID")?
            .ok_or(TaskError::NotFound)
    }

    async fn create_task_for_user(
        &self,
        user_id: Uuid,
        task: &NewTask,
        ext_cxn: &impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<Uuid, TaskError> {
        let created_task_id = task_write
            .create_task_for_user(user_id, task, ext_cxn)
            .await
            .context("creating a task")?;
        info!(%created_task_id, "task created");

        Ok(created_task_id)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<(), TaskError> {
        self.user_task_by_id(user_id, task_id, ext_cxn, task_read)
            .await?;

        let updated = task_write
            .update_user_task(user_id, task_id, update, ext_cxn)
            .await
            .context("updating a task")?;
        if !updated {
            return Err(TaskError::NotFound);
        }

        Ok(())
    }

    async fn delete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
        comment_write: &impl domain::comment::driven_ports::CommentWriter,
    ) -> Result<(), TaskError> {
        self.user_task_by_id(user_id, task_id, ext_cxn, task_read)
            .await?;

        let deleted = task_write
            .delete_user_task(user_id, task_id, ext_cxn)
            .await
            .context("deleting a task")?;
        if !deleted {
            return Err(TaskError::NotFound);
        }

        // The task is already gone at this point, so a failure here only leaves orphaned comments behind
        if let Err(cleanup_err) = comment_write
            .delete_comments_for_task(task_id, ext_cxn)
            .await
        {
            warn!(%task_id, "could not remove comments of deleted task: {cleanup_err:#}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::domain::comment::test_util::InMemoryCommentPersistence;
    use crate::domain::test_util::{Connectivity, user_id};
    use crate::domain::todo::driving_ports::TaskPort;
    use crate::external_connections;
    use speculoos::prelude::*;
    use std::sync::RwLock;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_owned(),
            content: None,
            status: TaskStatus::Incomplete,
        }
    }

    fn owned(owner: u128, title: &str) -> NewTaskWithOwner {
        NewTaskWithOwner {
            owner: user_id(owner),
            task: new_task(title),
        }
    }

    mod task_status {
        use super::*;

        #[test]
        fn defaults_to_incomplete() {
            assert_eq!(TaskStatus::Incomplete, TaskStatus::from_submitted(None));
            assert_eq!(TaskStatus::Incomplete, TaskStatus::from_submitted(Some("")));
            assert_eq!(
                TaskStatus::Incomplete,
                TaskStatus::from_submitted(Some("done"))
            );
        }

        #[test]
        fn recognizes_every_label() {
            for status in TaskStatus::ALL {
                assert_eq!(Some(status), TaskStatus::from_label(status.label()));
            }
            assert_eq!(
                TaskStatus::Complete,
                TaskStatus::from_submitted(Some("完了"))
            );
        }
    }

    mod task_list_query {
        use super::*;

        #[test]
        fn defaults_to_newest_first() {
            let query = TaskListQuery::from_params(None, None, None);
            assert_eq!(
                TaskListQuery {
                    status: None,
                    sort: SortColumn::CreatedAt,
                    order: SortOrder::Desc,
                },
                query
            );
        }

        #[test]
        fn ignores_unknown_values() {
            let query =
                TaskListQuery::from_params(Some("archived"), Some("id; drop"), Some("sideways"));
            assert_eq!(TaskListQuery::default(), query);
        }

        #[test]
        fn reads_known_values() {
            let query = TaskListQuery::from_params(Some("途中"), Some("title"), Some("asc"));
            assert_eq!(
                TaskListQuery {
                    status: Some(TaskStatus::InProgress),
                    sort: SortColumn::Title,
                    order: SortOrder::Asc,
                },
                query
            );
        }
    }

    mod tasks_for_user {
        use super::*;

        #[tokio::test]
        async fn only_returns_owned_tasks() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "Something to do"),
                owned(2, "Another thing to do"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let fetched_tasks = TaskService {}
                .tasks_for_user(user_id(1), &TaskListQuery::default(), &ext_cxn, &task_persist)
                .await;
            assert_that!(fetched_tasks).is_ok().matches(|tasks| {
                matches!(tasks.as_slice(), [
                    TodoTask { title, .. }
                ] if title == "Something to do")
            });
        }

        #[tokio::test]
        async fn sorts_by_title_ascending() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "cherry"),
                owned(1, "apple"),
                owned(1, "banana"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let query = TaskListQuery::from_params(None, Some("title"), Some("asc"));

            let titles: Vec<String> = TaskService {}
                .tasks_for_user(user_id(1), &query, &ext_cxn, &task_persist)
                .await
                .expect("listing should succeed")
                .into_iter()
                .map(|task| task.title)
                .collect();
            assert_eq!(vec!["apple", "banana", "cherry"], titles);
        }

        #[tokio::test]
        async fn newest_first_by_default() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "first"),
                owned(1, "second"),
                owned(1, "third"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let titles: Vec<String> = TaskService {}
                .tasks_for_user(user_id(1), &TaskListQuery::default(), &ext_cxn, &task_persist)
                .await
                .expect("listing should succeed")
                .into_iter()
                .map(|task| task.title)
                .collect();
            assert_eq!(vec!["third", "second", "first"], titles);
        }

        #[tokio::test]
        async fn filters_by_status() {
            let mut raw_persist = InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "open"),
                owned(1, "finished"),
            ]);
            raw_persist.tasks[1].status = TaskStatus::Complete;
            let task_persist = RwLock::new(raw_persist);
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let query = TaskListQuery::from_params(Some("完了"), None, None);

            let fetched_tasks = TaskService {}
                .tasks_for_user(user_id(1), &query, &ext_cxn, &task_persist)
                .await;
            assert_that!(fetched_tasks).is_ok().matches(|tasks| {
                matches!(tasks.as_slice(), [TodoTask { title, .. }] if title == "finished")
            });
        }

        #[tokio::test]
        async fn returns_port_err() {
            let mut raw_persist = InMemoryUserTaskPersistence::new();
            raw_persist.connected = Connectivity::Disconnected;
            let task_persist = RwLock::new(raw_persist);
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let fetched_tasks = TaskService {}
                .tasks_for_user(user_id(1), &TaskListQuery::default(), &ext_cxn, &task_persist)
                .await;
            assert!(matches!(fetched_tasks, Err(TaskError::PortError(_))));
        }
    }

    mod user_task_by_id {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "abcde"),
                owned(1, "fghijk"),
                owned(2, "lmnop"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let task_fetch_result = TaskService {}
                .user_task_by_id(user_id(1), task_id(2), &ext_cxn, &task_persist)
                .await;
            assert_that!(task_fetch_result).is_ok().matches(|task| {
                task.id == task_id(2) && task.owner_user_id == user_id(1) && task.title == "fghijk"
            });
        }

        #[tokio::test]
        async fn other_users_task_is_not_found() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "abcde"),
                owned(2, "lmnop"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let task_fetch_result = TaskService {}
                .user_task_by_id(user_id(1), task_id(2), &ext_cxn, &task_persist)
                .await;
            let Err(TaskError::NotFound) = task_fetch_result else {
                panic!("Expected another user's task to be hidden: {task_fetch_result:#?}");
            };
        }
    }

    mod create_task_for_user {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let task_persist = InMemoryUserTaskPersistence::new_locked();
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let task = NewTask {
                title: "Buy milk".to_owned(),
                content: Some("2 bottles".to_owned()),
                status: TaskStatus::from_submitted(None),
            };

            let create_result = TaskService {}
                .create_task_for_user(user_id(1), &task, &ext_cxn, &task_persist)
                .await;
            assert_that!(create_result).is_ok_containing(task_id(1));

            let locked_persist = task_persist.read().expect("task persist rw lock poisoned");
            assert!(matches!(locked_persist.tasks.as_slice(), [
                TodoTask {
                    title,
                    status: TaskStatus::Incomplete,
                    ..
                }
            ] if title == "Buy milk"));
        }

        #[tokio::test]
        async fn returns_port_err() {
            let mut raw_persist = InMemoryUserTaskPersistence::new();
            raw_persist.connected = Connectivity::Disconnected;
            let task_persist = RwLock::new(raw_persist);
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let create_result = TaskService {}
                .create_task_for_user(user_id(1), &new_task("x"), &ext_cxn, &task_persist)
                .await;
            assert!(matches!(create_result, Err(TaskError::PortError(_))));
        }
    }

    mod update_task {
        use super::*;

        fn completed_update() -> UpdateTask {
            UpdateTask {
                title: "Something to do".to_owned(),
                content: None,
                status: TaskStatus::Complete,
            }
        }

        #[tokio::test]
        async fn happy_path() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "abcde"),
                owned(1, "fghij"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_result = TaskService {}
                .update_task(
                    user_id(1),
                    task_id(2),
                    &completed_update(),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await;
            assert_that!(update_result).is_ok();

            let locked_persist = task_persist.read().expect("rw lock poisoned");
            assert_eq!("Something to do", locked_persist.tasks[1].title);
            assert_eq!(TaskStatus::Complete, locked_persist.tasks[1].status);
            assert!(locked_persist.tasks[1].updated_at > locked_persist.tasks[1].created_at);
        }

        #[tokio::test]
        async fn refuses_other_users_task() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(2, "not yours"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_result = TaskService {}
                .update_task(
                    user_id(1),
                    task_id(1),
                    &completed_update(),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await;
            assert!(matches!(update_result, Err(TaskError::NotFound)));

            let locked_persist = task_persist.read().expect("rw lock poisoned");
            assert_eq!("not yours", locked_persist.tasks[0].title);
            assert_eq!(TaskStatus::Incomplete, locked_persist.tasks[0].status);
        }

        #[tokio::test]
        async fn returns_port_err() {
            let mut raw_persist = InMemoryUserTaskPersistence::new_with_tasks(&[owned(1, "a")]);
            raw_persist.connected = Connectivity::Disconnected;
            let task_persist = RwLock::new(raw_persist);
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_result = TaskService {}
                .update_task(
                    user_id(1),
                    task_id(1),
                    &completed_update(),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await;
            assert!(matches!(update_result, Err(TaskError::PortError(_))));
        }
    }

    mod delete_task {
        use super::*;
        use crate::domain::comment::driven_ports::CommentReader;

        #[tokio::test]
        async fn removes_task_and_its_comments() {
            let task_persist = RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[
                owned(1, "abcde"),
                owned(1, "fghij"),
            ]));
            let comment_persist = RwLock::new(InMemoryCommentPersistence::new_with_comments(&[
                (task_id(2), user_id(1), "first"),
                (task_id(1), user_id(1), "keep me"),
            ]));
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_result = TaskService {}
                .delete_task(
                    user_id(1),
                    task_id(2),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                    &comment_persist,
                )
                .await;
            assert_that!(delete_result).is_ok();

            let remaining = TaskService {}
                .tasks_for_user(user_id(1), &TaskListQuery::default(), &ext_cxn, &task_persist)
                .await
                .expect("listing should succeed");
            assert!(matches!(remaining.as_slice(), [TodoTask { title, .. }] if title == "abcde"));

            let orphaned = comment_persist
                .comments_for_task(task_id(2), &ext_cxn)
                .await
                .expect("in-memory comments are connected");
            assert!(orphaned.is_empty());
            let kept = comment_persist
                .comments_for_task(task_id(1), &ext_cxn)
                .await
                .expect("in-memory comments are connected");
            assert_eq!(1, kept.len());
        }

        #[tokio::test]
        async fn refuses_other_users_task() {
            let task_persist =
                RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[owned(2, "abcde")]));
            let comment_persist = InMemoryCommentPersistence::new_locked();
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_result = TaskService {}
                .delete_task(
                    user_id(1),
                    task_id(1),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                    &comment_persist,
                )
                .await;
            assert!(matches!(delete_result, Err(TaskError::NotFound)));
            assert_eq!(1, task_persist.read().expect("rw lock poisoned").tasks.len());
        }

        #[tokio::test]
        async fn comment_cleanup_failure_is_not_an_error() {
            let task_persist =
                RwLock::new(InMemoryUserTaskPersistence::new_with_tasks(&[owned(1, "abcde")]));
            let mut raw_comments = InMemoryCommentPersistence::new();
            raw_comments.connected = Connectivity::Disconnected;
            let comment_persist = RwLock::new(raw_comments);
            let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_result = TaskService {}
                .delete_task(
                    user_id(1),
                    task_id(1),
                    &ext_cxn,
                    &task_persist,
                    &task_persist,
                    &comment_persist,
                )
                .await;
            assert_that!(delete_result).is_ok();
        }
    }

    /// Create, read, complete and delete a task the way a user would through the pages
    #[tokio::test]
    async fn task_lifecycle() {
        let task_persist = InMemoryUserTaskPersistence::new_locked();
        let comment_persist = InMemoryCommentPersistence::new_locked();
        let ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
        let service = TaskService {};
        let owner = user_id(1);

        let created_id = service
            .create_task_for_user(
                owner,
                &NewTask {
                    title: "Buy milk".to_owned(),
                    content: None,
                    status: TaskStatus::from_submitted(None),
                },
                &ext_cxn,
                &task_persist,
            )
            .await
            .expect("creation should succeed");

        let listed = service
            .tasks_for_user(owner, &TaskListQuery::default(), &ext_cxn, &task_persist)
            .await
            .expect("listing should succeed");
        assert!(matches!(listed.as_slice(), [TodoTask {
            status: TaskStatus::Incomplete,
            ..
        }]));

        service
            .update_task(
                owner,
                created_id,
                &UpdateTask {
                    title: "Buy milk".to_owned(),
                    content: None,
                    status: TaskStatus::Complete,
                },
                &ext_cxn,
                &task_persist,
                &task_persist,
            )
            .await
            .expect("update should succeed");
        let detail = service
            .user_task_by_id(owner, created_id, &ext_cxn, &task_persist)
            .await
            .expect("task should exist");
        assert_eq!(TaskStatus::Complete, detail.status);

        service
            .delete_task(
                owner,
                created_id,
                &ext_cxn,
                &task_persist,
                &task_persist,
                &comment_persist,
            )
            .await
            .expect("delete should succeed");
        let listed = service
            .tasks_for_user(owner, &TaskListQuery::default(), &ext_cxn, &task_persist)
            .await
            .expect("listing should succeed");
        assert!(listed.is_empty());
    }
}
