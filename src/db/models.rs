use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub completed: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Active tasks are the only ones subject to priority uniqueness.
    pub fn is_active(&self) -> bool {
        !self.completed && !self.deleted
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedTasks {
    pub tasks: Vec<Task>,
    pub total_count: i64,
    pub has_more: bool,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub active: i64,
    pub completed: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskListKind {
    /// Not deleted, not completed
    Active,
    /// Completed and not deleted
    Completed,
    /// Everything not deleted
    All,
}
