use serde::{Deserialize, Serialize};

use crate::{Task, TaskId};

/// A user command describing an intended state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum TaskIntent {
    /// Create a new pending task. The title is validated by the caller.
    AddTask {
        /// Title of the new task.
        title: String,
        /// Optional description.
        description: Option<String>,
    },
    /// Overwrite an existing task row.
    UpdateTask {
        /// Replacement row; `task.id` selects the target.
        task: Task,
    },
    /// Flip the completion flag of a task.
    CheckTask {
        /// Target task.
        id: TaskId,
    },
    /// Remove a task.
    DeleteTask {
        /// Target task.
        id: TaskId,
    },
    /// Subscribe to tasks whose title contains `query`.
    SearchTask {
        /// Substring to look for; empty lists everything.
        query: String,
    },
    /// Collapse or expand the finished section.
    ToggleFinishedTasks,
    /// Collapse or expand the pending section.
    TogglePendingTasks,
}

impl TaskIntent {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddTask { .. } => "add_task",
            Self::UpdateTask { .. } => "update_task",
            Self::CheckTask { .. } => "check_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::SearchTask { .. } => "search_task",
            Self::ToggleFinishedTasks => "toggle_finished_tasks",
            Self::TogglePendingTasks => "toggle_pending_tasks",
        }
    }
}
