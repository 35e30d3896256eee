/// Task model
///
/// A task is a unit of work belonging to exactly one user. Only its status
/// ever changes after creation.
///
/// # State Machine
///
/// ```text
/// new → in_progress → completed
/// new ─────────────→ completed
/// in_progress ⇄ completed
/// ```
///
/// Any update to `in_progress` or `completed` is accepted; `new` is only ever
/// assigned at creation.
///
/// # Stored Format
///
/// Key `todo:{id}`:
///
/// ```json
/// {
///   "id": "9b1d...",
///   "task": "buy milk",
///   "status": "new",
///   "user_id": "5f0c...",
///   "created_at": "2024-05-01T10:00:00.123456789Z"
/// }
/// ```
///
/// Older records name the owner field `user`; both spellings decode.

use crate::codec::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Freshly created
    New,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Converts status to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Whether a task may be moved to this status by an explicit update
    pub fn is_update_target(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Completed)
    }

    /// Parses a requested update target
    ///
    /// Returns `None` for anything other than `in_progress` or `completed`.
    pub fn parse_update(value: &str) -> Option<Self> {
        value.parse().ok().filter(TaskStatus::is_update_target)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(TaskStatus::New),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("Invalid task status: {}", other)),
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID (UUID v4), immutable
    pub id: Uuid,

    /// Description, immutable
    pub task: String,

    /// Current status
    pub status: TaskStatus,

    /// Owning user's ID, immutable
    #[serde(rename = "user_id", alias = "user")]
    pub owner_id: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task in status `new` with a fresh ID
    pub fn new(task: String, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            status: TaskStatus::New,
            owner_id,
            created_at: Utc::now(),
        }
    }

    /// Whether the task belongs to `user_id`
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

impl Record for Task {
    const PREFIX: &'static str = "todo:";
    const ENTITY: &'static str = "task";

    fn id(&self) -> String {
        self.id.to_string()
    }
}
