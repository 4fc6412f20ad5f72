//! Storage seam between the repository and a concrete task table.

use anyhow::Error;
use tasklist_core::{Task, TaskId};
use tasklist_store_sqlite::{SqliteStore, StoreError};
use tokio::sync::watch;

use crate::live_query::TaskQuery;

/// Minimal storage abstraction required by [`crate::TaskUseCase`].
///
/// Methods are blocking; callers run them on the blocking thread pool.
pub trait TaskStore: Send + Sync + 'static {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Insert or replace a task and return its id.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn add(&self, task: &Task) -> Result<TaskId, Self::Error>;

    /// Overwrite an existing task. Returns `false` when no row matched.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn update(&self, task: &Task) -> Result<bool, Self::Error>;

    /// Delete a task. Returns `false` when no row matched.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn delete(&self, id: TaskId) -> Result<bool, Self::Error>;

    /// Flip the completion flag. Returns `false` when no row matched.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn toggle_complete(&self, id: TaskId) -> Result<bool, Self::Error>;

    /// Every task in natural storage order.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn list_all(&self) -> Result<Vec<Task>, Self::Error>;

    /// Tasks whose title contains `query`.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn search(&self, query: &str) -> Result<Vec<Task>, Self::Error>;

    /// Change notifications for the task table.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Run one of the supported list queries.
    ///
    /// # Errors
    /// Propagates the error of the underlying query.
    fn run(&self, query: &TaskQuery) -> Result<Vec<Task>, Self::Error> {
        match query {
            TaskQuery::All => self.list_all(),
            TaskQuery::Search(text) => self.search(text),
        }
    }

    /// Release the underlying resources.
    ///
    /// The default implementation does nothing.
    ///
    /// # Errors
    /// Returns a store-specific error when closing fails.
    fn close(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    type Error = StoreError;

    fn add(&self, task: &Task) -> Result<TaskId, Self::Error> {
        Self::add(self, task)
    }

    fn update(&self, task: &Task) -> Result<bool, Self::Error> {
        Self::update(self, task)
    }

    fn delete(&self, id: TaskId) -> Result<bool, Self::Error> {
        Self::delete(self, id)
    }

    fn toggle_complete(&self, id: TaskId) -> Result<bool, Self::Error> {
        Self::toggle_complete(self, id)
    }

    fn list_all(&self) -> Result<Vec<Task>, Self::Error> {
        Self::list_all(self)
    }

    fn search(&self, query: &str) -> Result<Vec<Task>, Self::Error> {
        Self::search(self, query)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        Self::subscribe(self)
    }

    fn close(&self) -> Result<(), Self::Error> {
        Self::close(self)
    }
}
