//! Application layer for the task list.
//!
//! This crate wires the SQLite store to the reducer: a lazily opened
//! repository ([`TaskUseCase`]), live queries that re-run on every table
//! change ([`LiveQuery`]), and the intent reducer ([`MainViewModel`]) that
//! owns the observable UI state.

pub mod config;
pub mod live_query;
pub mod task_store;
pub mod task_use_case;
pub mod view_model;

// Re-exports for convenience
pub use config::{DatabaseConfig, ProjectConfig, UiConfig};
pub use live_query::{LiveQuery, TaskQuery};
pub use task_store::TaskStore;
pub use task_use_case::{TaskUseCase, UseCaseError};
pub use view_model::{MainViewModel, ViewModelError};
