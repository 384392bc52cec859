use serde::{Deserialize, Serialize};

pub type Timestamp = i64;

/// Every task tracks exactly this many day slots.
pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Complete,
    Failed,
    Break,
}

/// One of a task's 7 per-day status records for the tracked week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DaySlot {
    pub date: Timestamp,
    pub status: Option<DayStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Slot `i` is day `anchor + i` of the week the task was last anchored to.
    pub weekly_status: Vec<DaySlot>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub failed_at: Option<Timestamp>,
    #[serde(default)]
    pub on_break: bool,
    #[serde(default)]
    pub break_started_at: Option<Timestamp>,
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update applied by `TaskStore::update_task`; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Score {
    pub points: i64,
    pub level: i64,
}

/// Reminder records outlive their task: deleting a task does not remove its
/// reminders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Reminder {
    pub id: String,
    pub task_id: String,
    /// Title snapshot taken when the reminder was created.
    pub task_title: String,
    pub time: Timestamp,
    pub message: String,
}

/// Document persisted under the `taskData` storage key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub points: i64,
}
