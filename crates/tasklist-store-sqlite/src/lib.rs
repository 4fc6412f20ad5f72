//! SQLite-backed storage for the task list.
//!
//! All tasks live in a single `tasks` table. Every mutation that touches the
//! table bumps a version counter published through a [`watch`] channel, which
//! live queries use to know when to re-run.

mod error;

pub use error::StoreError;

use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tasklist_core::{Task, TaskId};
use tokio::sync::watch;
use tracing::{debug, info};

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    is_completed INTEGER NOT NULL DEFAULT 0
);";

const SELECT_COLUMNS: &str = "SELECT id, title, description, is_completed FROM tasks";

/// Storage based on a single SQLite `tasks` table.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    changes: watch::Sender<u64>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or SQLite fails to
    /// open the file or apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(path = %path.display(), "Opened task database");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if SQLite cannot create the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            changes,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }

    fn notify_changed(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Receive a notification after every write that touched the table.
    ///
    /// The carried value is a monotonically increasing version counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Insert a task, replacing any row that already has the same id.
    ///
    /// A task carrying [`TaskId::UNASSIGNED`] receives a fresh id that was
    /// never used before, even by rows that have since been deleted.
    ///
    /// # Errors
    /// Returns an error if SQLite rejects the insert.
    pub fn add(&self, task: &Task) -> Result<TaskId> {
        let requested = (!task.id.is_unassigned()).then(|| task.id.get());
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO tasks (id, title, description, is_completed)
                 VALUES (?1, ?2, ?3, ?4)",
                params![requested, task.title, task.description, task.is_completed],
            )?;
            Ok(TaskId(requested.unwrap_or_else(|| conn.last_insert_rowid())))
        })?;
        info!(%id, "Stored task");
        self.notify_changed();
        Ok(id)
    }

    /// Overwrite the row matching `task.id`.
    ///
    /// Returns `false` without error when no such row exists.
    ///
    /// # Errors
    /// Returns an error if SQLite rejects the update.
    pub fn update(&self, task: &Task) -> Result<bool> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE tasks SET title = ?2, description = ?3, is_completed = ?4 WHERE id = ?1",
                params![task.id.get(), task.title, task.description, task.is_completed],
            )?)
        })?;
        self.finish_write("Updated task", task.id, changed)
    }

    /// Remove the row with the given id. Absent ids are ignored.
    ///
    /// # Errors
    /// Returns an error if SQLite rejects the delete.
    pub fn delete(&self, id: TaskId) -> Result<bool> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.get()])?)
        })?;
        self.finish_write("Deleted task", id, changed)
    }

    /// Flip the completion flag of the row with the given id.
    ///
    /// # Errors
    /// Returns an error if SQLite rejects the update.
    pub fn toggle_complete(&self, id: TaskId) -> Result<bool> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE tasks SET is_completed = NOT is_completed WHERE id = ?1",
                params![id.get()],
            )?)
        })?;
        self.finish_write("Toggled task completion", id, changed)
    }

    fn finish_write(&self, what: &'static str, id: TaskId, changed: usize) -> Result<bool> {
        if changed == 0 {
            debug!(%id, "{what}: no matching row");
            return Ok(false);
        }
        info!(%id, "{what}");
        self.notify_changed();
        Ok(true)
    }

    /// Every task in natural storage order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_all(&self) -> Result<Vec<Task>> {
        let tasks = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
            let rows = stmt.query_map([], task_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        debug!(count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    /// Tasks whose title contains `query`, ignoring ASCII case.
    ///
    /// The query is matched literally; `%` and `_` are not wildcards.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn search(&self, query: &str) -> Result<Vec<Task>> {
        let pattern = format!("%{}%", escape_like(query));
        let tasks = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{SELECT_COLUMNS} WHERE title LIKE ?1 ESCAPE '\\' ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![pattern], task_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        debug!(query, count = tasks.len(), "Searched tasks");
        Ok(tasks)
    }

    /// Close the underlying connection. Later calls fail with [`StoreError::Closed`].
    ///
    /// # Errors
    /// Returns an error if SQLite fails to close the connection cleanly.
    pub fn close(&self) -> Result<()> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
            info!("Closed task database");
        }
        Ok(())
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        is_completed: row.get(3)?,
    })
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
