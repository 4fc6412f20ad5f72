//! Repository façade that owns the store handle and opens it on first use.

use std::sync::Arc;

use tasklist_core::{Task, TaskId};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::live_query::{LiveQuery, TaskQuery};
use crate::task_store::TaskStore;

/// Errors surfaced by [`TaskUseCase`] operations.
#[derive(Debug, Error)]
pub enum UseCaseError {
    /// The store could not be opened.
    #[error("failed to open task store: {0:#}")]
    Open(anyhow::Error),

    /// The store reported a failure while serving a command or query.
    #[error("{0:#}")]
    Store(anyhow::Error),

    /// The blocking worker running the store call panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type Opener<S> = Arc<dyn Fn() -> anyhow::Result<S> + Send + Sync>;

/// Single indirection point between the reducer and the task store.
///
/// The store is opened at most once, on the first call that needs it, even
/// when several callers race on [`init_db`](Self::init_db).
pub struct TaskUseCase<S> {
    opener: Opener<S>,
    store: OnceCell<Arc<S>>,
}

impl<S: TaskStore> TaskUseCase<S> {
    /// Create a repository that opens its store lazily with `opener`.
    #[must_use]
    pub fn new(opener: impl Fn() -> anyhow::Result<S> + Send + Sync + 'static) -> Self {
        Self {
            opener: Arc::new(opener),
            store: OnceCell::new(),
        }
    }

    /// Wrap an already opened store.
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self {
            opener: Arc::new(|| Err(anyhow::anyhow!("store was provided already opened"))),
            store: OnceCell::new_with(Some(Arc::new(store))),
        }
    }

    /// Whether the store has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.store.initialized()
    }

    /// Open the store if that has not happened yet and return the shared handle.
    ///
    /// Calls after the first successful one are no-ops. A failed attempt leaves
    /// the repository unopened so a later call can try again.
    ///
    /// # Errors
    /// Returns [`UseCaseError::Open`] when the opener fails.
    pub async fn init_db(&self) -> Result<Arc<S>, UseCaseError> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let opener = Arc::clone(&self.opener);
                let store = tokio::task::spawn_blocking(move || opener())
                    .await?
                    .map_err(UseCaseError::Open)?;
                info!("Task store initialised");
                Ok::<_, UseCaseError>(Arc::new(store))
            })
            .await?;
        Ok(Arc::clone(store))
    }

    async fn blocking<T, F>(&self, action: F) -> Result<T, UseCaseError>
    where
        F: FnOnce(&S) -> Result<T, S::Error> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.init_db().await?;
        tokio::task::spawn_blocking(move || action(store.as_ref()).map_err(|err| UseCaseError::Store(err.into())))
            .await?
    }

    /// Store a new task (or replace the row with the same id).
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or rejects the write.
    pub async fn add_task(&self, task: Task) -> Result<TaskId, UseCaseError> {
        self.blocking(move |store| store.add(&task)).await
    }

    /// Overwrite an existing task; missing rows are ignored.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or rejects the write.
    pub async fn update_task(&self, task: Task) -> Result<bool, UseCaseError> {
        self.blocking(move |store| store.update(&task)).await
    }

    /// Delete a task; missing rows are ignored.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or rejects the write.
    pub async fn delete_task(&self, id: TaskId) -> Result<bool, UseCaseError> {
        self.blocking(move |store| store.delete(id)).await
    }

    /// Flip the completion flag of a task; missing rows are ignored.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or rejects the write.
    pub async fn check_task(&self, id: TaskId) -> Result<bool, UseCaseError> {
        self.blocking(move |store| store.toggle_complete(id)).await
    }

    /// Live sequence of tasks whose title contains `query`.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened.
    pub async fn search_task(&self, query: impl Into<String>) -> Result<LiveQuery<S>, UseCaseError> {
        self.live(TaskQuery::Search(query.into())).await
    }

    /// Live sequence of every task.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened.
    pub async fn get_all_tasks(&self) -> Result<LiveQuery<S>, UseCaseError> {
        self.live(TaskQuery::All).await
    }

    /// Live sequence for an arbitrary [`TaskQuery`].
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened.
    pub async fn live(&self, query: TaskQuery) -> Result<LiveQuery<S>, UseCaseError> {
        let store = self.init_db().await?;
        debug!(%query, "Starting live query");
        Ok(LiveQuery::new(store, query))
    }

    /// Close the store at application teardown. Does nothing if it was never opened.
    ///
    /// # Errors
    /// Returns an error when the store fails to close.
    pub async fn close(&self) -> Result<(), UseCaseError> {
        let Some(store) = self.store.get().map(Arc::clone) else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || store.close().map_err(|err| UseCaseError::Store(err.into())))
            .await?
    }
}
