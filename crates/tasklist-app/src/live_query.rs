//! Re-emitting task queries.

use std::fmt;
use std::sync::Arc;

use tasklist_core::Task;
use tokio::sync::watch;
use tracing::debug;

use crate::task_store::TaskStore;
use crate::task_use_case::UseCaseError;

/// The two list queries the UI can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskQuery {
    /// Every task, unfiltered.
    All,
    /// Tasks whose title contains the given text.
    Search(String),
}

impl TaskQuery {
    /// Search text this query filters by; empty for [`TaskQuery::All`].
    #[must_use]
    pub fn search_text(&self) -> &str {
        match self {
            Self::All => "",
            Self::Search(text) => text,
        }
    }
}

impl fmt::Display for TaskQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Search(text) => write!(f, "search({text:?})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Running,
    Done,
}

/// A query result sequence that re-emits whenever the task table changes.
///
/// The first [`next`](Self::next) resolves immediately with the current rows.
/// Each later call waits for a write to the table and runs the query again;
/// bursts of writes are coalesced into one emission. The first error ends the
/// sequence. Build a new `LiveQuery` to retry.
pub struct LiveQuery<S> {
    store: Arc<S>,
    query: TaskQuery,
    changes: watch::Receiver<u64>,
    phase: Phase,
}

impl<S: TaskStore> LiveQuery<S> {
    /// Subscribe to `query` on `store`.
    #[must_use]
    pub fn new(store: Arc<S>, query: TaskQuery) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            query,
            changes,
            phase: Phase::Fresh,
        }
    }

    /// The query this sequence runs.
    #[must_use]
    pub const fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// Wait for the next result set.
    ///
    /// Returns `None` once the sequence has ended, either after an error or
    /// because the store went away.
    pub async fn next(&mut self) -> Option<Result<Vec<Task>, UseCaseError>> {
        match self.phase {
            Phase::Done => return None,
            Phase::Fresh => {
                self.changes.borrow_and_update();
                self.phase = Phase::Running;
            }
            Phase::Running => {
                if self.changes.changed().await.is_err() {
                    self.phase = Phase::Done;
                    return None;
                }
            }
        }

        let store = Arc::clone(&self.store);
        let query = self.query.clone();
        let result = tokio::task::spawn_blocking(move || {
            store.run(&query).map_err(|err| UseCaseError::Store(err.into()))
        })
        .await
        .map_err(UseCaseError::from)
        .and_then(|rows| rows);

        match &result {
            Ok(rows) => debug!(query = %self.query, count = rows.len(), "Live query emitted"),
            Err(err) => {
                debug!(query = %self.query, error = %err, "Live query failed");
                self.phase = Phase::Done;
            }
        }
        Some(result)
    }
}
