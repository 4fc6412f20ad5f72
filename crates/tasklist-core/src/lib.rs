//! Domain types for the task list: tasks, intents and the observable UI state.

/// Identifier types.
pub mod id;
/// User intents accepted by the reducer.
pub mod intent;
/// UI state and the resource envelope around it.
pub mod state;

pub use crate::id::{InvalidTaskId, TaskId};
pub use crate::intent::TaskIntent;
pub use crate::state::{Resource, TaskState};

use serde::{Deserialize, Serialize};

/// A short text task as stored and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, [`TaskId::UNASSIGNED`] until persisted.
    pub id: TaskId,
    /// Human-readable title. Never empty for tasks created through the UI.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Completion flag; completed tasks are listed in the finished section.
    pub is_completed: bool,
}

impl Task {
    /// Build a task that has not been persisted yet.
    #[must_use]
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: TaskId::UNASSIGNED,
            title: title.into(),
            description,
            is_completed: false,
        }
    }

    /// Copy of this task with the completion flag flipped.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }

    /// Copy of this task carrying the given id.
    #[must_use]
    pub fn with_id(self, id: TaskId) -> Self {
        Self { id, ..self }
    }
}
