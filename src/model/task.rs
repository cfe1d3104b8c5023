use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::TaskId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// View-only state, never persisted.
    #[serde(skip)]
    pub is_editing: bool,
    #[serde(skip)]
    pub edit_title: String,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            is_completed: false,
            created_at: OffsetDateTime::now_utc(),
            is_editing: false,
            edit_title: String::new(),
        }
    }

    /// Rebuilds a task from persisted fields, keeping id and timestamp verbatim.
    pub fn restore(
        id: TaskId,
        title: String,
        is_completed: bool,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            title,
            is_completed,
            created_at,
            is_editing: false,
            edit_title: String::new(),
        }
    }
}
