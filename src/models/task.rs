use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// How urgent a task is. Stored as the `task_priority` enum type.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal scheduling.
    Medium,
    /// Should be picked up next.
    High,
    /// Drop everything else.
    Urgent,
}

/// Where a task is in its workflow. Stored as the `task_status` enum type.
/// New tasks start as `todo`.
#[derive(
    Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Someone is working on it.
    InProgress,
    /// Work is finished and waiting for a second look.
    Review,
    /// Finished.
    Done,
}

/// Body for creating a task or replacing an existing one.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TaskInput {
    /// Short summary, 1 to 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Free text, at most 1000 characters.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Left empty when the task has no particular priority.
    pub priority: Option<TaskPriority>,

    /// Deadline, if any.
    pub due_date: Option<DateTime<Utc>>,

    /// Defaults to `todo` when omitted.
    #[serde(default)]
    pub status: TaskStatus,

    /// Id of the user the task is assigned to.
    pub assigned_to: Option<i32>,
}

/// A stored task.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    /// Random v4 id assigned on creation.
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Absent when the task was created without one.
    pub priority: Option<TaskPriority>,
    pub status: TaskStatus,
    /// Deadline, if any.
    pub due_date: Option<DateTime<Utc>>,
    /// Set once on insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed by every update.
    pub updated_at: DateTime<Utc>,
    /// Owner; listing and lookups are always scoped to it.
    pub user_id: i32,
    /// Id of the assignee, which need not be the owner.
    pub assigned_to: Option<i32>,
}

/// Filters accepted by `GET /tasks`. All of them combine with AND.
#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    /// Only tasks in this status.
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    pub priority: Option<TaskPriority>,
    /// Only tasks assigned to this user id.
    pub assigned_to: Option<i32>,
    /// Case-insensitive substring match on title or description.
    pub search: Option<String>,
}

impl Task {
    /// A fresh task owned by `owner`, stamped with the current time.
    pub fn new(input: TaskInput, owner: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: input.status,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            user_id: owner,
            assigned_to: input.assigned_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: Some("Write the quarterly report".to_string()),
            priority: Some(TaskPriority::High),
            due_date: Some(Utc::now()),
            status: TaskStatus::Todo,
            assigned_to: None,
        }
    }

    #[test]
    fn test_task_creation() {
        let task = Task::new(input("Report"), 1);

        assert_eq!(task.title, "Report");
        assert_eq!(task.user_id, 1);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.assigned_to.is_none());
    }

    #[test]
    fn test_task_input_validation() {
        assert!(input("Valid Title").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input(&"a".repeat(201)).validate().is_err());

        let mut long_description = input("Valid Title");
        long_description.description = Some("b".repeat(1001));
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_status_defaults_to_todo_and_uses_snake_case() {
        let parsed: TaskInput = serde_json::from_value(serde_json::json!({
            "title": "Plan sprint",
            "priority": "urgent"
        }))
        .unwrap();
        assert_eq!(parsed.status, TaskStatus::Todo);
        assert_eq!(parsed.priority, Some(TaskPriority::Urgent));

        let status: TaskStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
    }
}
