//! Error types for SQLite store operations.

use thiserror::Error;

/// Errors that can occur during `SqliteStore` operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite reported a failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous panic poisoned the connection lock.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// The store was closed and no longer accepts work.
    #[error("Store is closed")]
    Closed,
}
