use serde::{Deserialize, Serialize};

use crate::Task;

/// Renderable list state: the last query result split into two sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    /// Tasks that are not completed, in query order.
    pub pending_tasks: Vec<Task>,
    /// Whether the pending section is expanded.
    pub show_pending_tasks: bool,
    /// Completed tasks, in query order.
    pub finished_tasks: Vec<Task>,
    /// Whether the finished section is expanded.
    pub show_finished_tasks: bool,
    /// Search string the lists were filtered by (empty for the full list).
    pub search_query: String,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            pending_tasks: Vec::new(),
            show_pending_tasks: true,
            finished_tasks: Vec::new(),
            show_finished_tasks: true,
            search_query: String::new(),
        }
    }
}

impl TaskState {
    /// Partition a query result into pending and finished sections.
    ///
    /// Relative order inside each section follows the input order.
    #[must_use]
    pub fn from_tasks(tasks: Vec<Task>, search_query: impl Into<String>) -> Self {
        let (finished_tasks, pending_tasks) = tasks.into_iter().partition(|task| task.is_completed);
        Self {
            pending_tasks,
            finished_tasks,
            search_query: search_query.into(),
            ..Self::default()
        }
    }

    /// New state with the finished section collapsed or expanded.
    #[must_use]
    pub fn toggle_finished(&self) -> Self {
        Self {
            show_finished_tasks: !self.show_finished_tasks,
            ..self.clone()
        }
    }

    /// New state with the pending section collapsed or expanded.
    #[must_use]
    pub fn toggle_pending(&self) -> Self {
        Self {
            show_pending_tasks: !self.show_pending_tasks,
            ..self.clone()
        }
    }

    /// Number of tasks across both sections.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending_tasks.len() + self.finished_tasks.len()
    }

    /// True when the query returned no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Lifecycle of an asynchronously produced value, as observed by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Resource<T> {
    /// Nothing has been queried yet.
    #[default]
    Empty,
    /// A mutation is in flight.
    Loading,
    /// Latest query result.
    Success(T),
    /// The last query failed; the message is meant for display.
    Error(String),
}

impl<T> Resource<T> {
    /// Borrow the payload of a `Success`.
    #[must_use]
    pub const fn as_success(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Variant name used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }

    /// Error message, if this is an `Error`.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}
