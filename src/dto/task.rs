use crate::domain;
use crate::domain::todo::{SortColumn, SortOrder, TaskListQuery, TaskStatus};
use crate::views;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Fields of the task form, in the order their problems should be reported
pub const TASK_FORM_FIELDS: [&str; 2] = ["title", "content"];

fn required_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        let mut missing = ValidationError::new("required");
        missing.message = Some(Cow::from("タイトルは必須です"));
        return Err(missing);
    }

    Ok(())
}

/// DTO for the form used to create or edit a task
#[derive(Deserialize, Validate, Display, Debug)]
#[display("{title}")]
#[cfg_attr(test, derive(Serialize))]
pub struct TaskForm {
    #[serde(default)]
    #[validate(
        custom = "required_title",
        length(max = 50, message = "タイトルは50文字以内で入力してください")
    )]
    pub title: String,
    #[validate(length(max = 100, message = "内容は100文字以内で入力してください"))]
    pub content: Option<String>,
    pub status: Option<String>,
}

impl TaskForm {
    /// A blank content field is stored as no content at all
    fn stored_content(&self) -> Option<String> {
        self.content
            .as_ref()
            .filter(|content| !content.is_empty())
            .cloned()
    }

    fn stored_status(&self) -> TaskStatus {
        TaskStatus::from_submitted(self.status.as_deref())
    }
}

impl From<&TaskForm> for domain::todo::NewTask {
    fn from(value: &TaskForm) -> Self {
        domain::todo::NewTask {
            title: value.title.clone(),
            content: value.stored_content(),
            status: value.stored_status(),
        }
    }
}

impl From<&TaskForm> for domain::todo::UpdateTask {
    fn from(value: &TaskForm) -> Self {
        domain::todo::UpdateTask {
            title: value.title.clone(),
            content: value.stored_content(),
            status: value.stored_status(),
        }
    }
}

/// Query string accepted by the task list page
#[derive(Deserialize, Default, Debug)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl From<&TaskListParams> for TaskListQuery {
    fn from(value: &TaskListParams) -> Self {
        TaskListQuery::from_params(
            value.status.as_deref(),
            value.sort.as_deref(),
            value.order.as_deref(),
        )
    }
}

/// A task as the page templates display it
#[derive(Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub status: &'static str,
    pub status_class: &'static str,
    pub created_on: String,
    pub updated_on: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<domain::todo::TodoTask> for TaskView {
    fn from(value: domain::todo::TodoTask) -> Self {
        TaskView {
            id: value.id,
            title: value.title,
            content: value.content,
            status: value.status.label(),
            status_class: match value.status {
                TaskStatus::Complete => "status-complete",
                TaskStatus::InProgress => "status-in-progress",
                TaskStatus::Incomplete => "status-incomplete",
            },
            created_on: views::display_date(value.created_at),
            updated_on: views::display_date(value.updated_at),
            created_at: views::display_datetime(value.created_at),
            updated_at: views::display_datetime(value.updated_at),
        }
    }
}

/// Values to put back into the task form when it is shown again
#[derive(Serialize, Default)]
pub struct TaskFormValues {
    pub title: String,
    pub content: String,
    pub status: &'static str,
}

impl From<&TaskForm> for TaskFormValues {
    fn from(value: &TaskForm) -> Self {
        TaskFormValues {
            title: value.title.clone(),
            content: value.content.clone().unwrap_or_default(),
            status: value.stored_status().label(),
        }
    }
}

impl From<&domain::todo::TodoTask> for TaskFormValues {
    fn from(value: &domain::todo::TodoTask) -> Self {
        TaskFormValues {
            title: value.title.clone(),
            content: value.content.clone().unwrap_or_default(),
            status: value.status.label(),
        }
    }
}

/// One choice in the filter or sort bar of the task list
#[derive(Serialize)]
pub struct FilterLink {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// Links of the task list's filter bar, each keeping the other current parameters
#[derive(Serialize)]
pub struct TaskListFilters {
    pub statuses: Vec<FilterLink>,
    pub sorts: Vec<FilterLink>,
    pub order_toggle: FilterLink,
}

fn list_href(status: Option<TaskStatus>, sort: SortColumn, order: SortOrder) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(status) = status {
        query.append_pair("status", status.label());
    }
    query.append_pair("sort", sort.column_name());
    query.append_pair("order", order.as_str());

    format!("/todos?{}", query.finish())
}

impl From<&TaskListQuery> for TaskListFilters {
    fn from(current: &TaskListQuery) -> Self {
        let mut statuses = vec![FilterLink {
            label: "すべて",
            href: list_href(None, current.sort, current.order),
            active: current.status.is_none(),
        }];
        statuses.extend(TaskStatus::ALL.into_iter().map(|status| FilterLink {
            label: status.label(),
            href: list_href(Some(status), current.sort, current.order),
            active: current.status == Some(status),
        }));

        let sorts = [
            (SortColumn::CreatedAt, "作成日"),
            (SortColumn::UpdatedAt, "更新日"),
            (SortColumn::Title, "タイトル"),
        ]
        .into_iter()
        .map(|(column, label)| FilterLink {
            label,
            href: list_href(current.status, column, current.order),
            active: current.sort == column,
        })
        .collect();

        let (toggled, label) = match current.order {
            SortOrder::Asc => (SortOrder::Desc, "▲ 昇順"),
            SortOrder::Desc => (SortOrder::Asc, "▼ 降順"),
        };

        TaskListFilters {
            statuses,
            sorts,
            order_toggle: FilterLink {
                label,
                href: list_href(current.status, current.sort, toggled),
                active: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    fn form(title: &str, content: Option<&str>) -> TaskForm {
        TaskForm {
            title: title.to_owned(),
            content: content.map(str::to_owned),
            status: None,
        }
    }

    #[test]
    fn title_is_required() {
        let errors = form("", None).validate().expect_err("blank title is invalid");
        let field_errors = errors.field_errors();

        assert!(matches!(
            field_errors.get("title").map(|errs| errs.as_slice()),
            Some([error]) if error.message.as_deref() == Some("タイトルは必須です")
        ));
    }

    #[test]
    fn lengths_count_characters() {
        let fifty_kana: String = "あ".repeat(50);
        assert_that!(form(&fifty_kana, Some(&"い".repeat(100))).validate()).is_ok();

        let errors = form(&"あ".repeat(51), Some(&"い".repeat(101)))
            .validate()
            .expect_err("overlong fields are invalid");
        let field_errors = errors.field_errors();
        assert!(field_errors.contains_key("title"));
        assert!(field_errors.contains_key("content"));
    }

    #[test]
    fn blank_content_is_stored_as_none() {
        let new_task = domain::todo::NewTask::from(&form("Buy milk", Some("")));

        assert_that!(new_task.content).is_none();
        assert_that!(new_task.status).is_equal_to(TaskStatus::Incomplete);
    }

    #[test]
    fn unknown_status_is_stored_as_incomplete() {
        let mut submitted = form("Buy milk", None);
        submitted.status = Some("保留".to_owned());

        let update = domain::todo::UpdateTask::from(&submitted);
        assert_that!(update.status).is_equal_to(TaskStatus::Incomplete);
    }

    #[test]
    fn filter_links_keep_other_parameters() {
        let current = TaskListQuery {
            status: Some(TaskStatus::Complete),
            sort: SortColumn::Title,
            order: SortOrder::Asc,
        };
        let filters = TaskListFilters::from(&current);

        assert_that!(filters.statuses).has_length(4);
        assert!(matches!(
            filters.statuses.as_slice(),
            [all, ..] if !all.active && all.href == "/todos?sort=title&order=asc"
        ));
        assert_that!(filters.order_toggle.href.as_str())
            .is_equal_to("/todos?status=%E5%AE%8C%E4%BA%86&sort=title&order=desc");
        assert_that!(filters.order_toggle.label).is_equal_to("▲ 昇順");
    }
}
