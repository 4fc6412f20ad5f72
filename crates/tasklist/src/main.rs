//! CLI entry point for tasklist.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use tasklist_app::{DatabaseConfig, MainViewModel, ProjectConfig, TaskUseCase};
use tasklist_core::TaskId;
use tasklist_store_sqlite::SqliteStore;

mod commands;
mod render;
mod shell;

/// Single-screen task list backed by a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "tasklist", version, about = "tasklist: short text tasks stored in a local SQLite table")]
struct Cli {
    /// Project directory used to discover `.tasklist/config.toml` (defaults to current).
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Database file, overriding the configured location.
    #[arg(long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new pending task.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Replace the title and description of a task.
    Update {
        #[arg(long)]
        id: TaskId,
        #[arg(long)]
        title: String,
        /// New description; the current one is kept when omitted.
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description.
        #[arg(long)]
        clear_description: bool,
        /// Set the completion flag explicitly instead of keeping it.
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Toggle the completion flag of a task.
    Check {
        #[arg(long)]
        id: TaskId,
    },

    /// Delete a task.
    Delete {
        #[arg(long)]
        id: TaskId,
    },

    /// List tasks, optionally filtered by a title substring.
    Ls {
        #[arg(long, short = 'q')]
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Interactive session that keeps the list live.
    Shell,
}

/// Output format for `ls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let Cli { dir, database, cmd } = Cli::parse();
    install_tracing();

    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let mut config = ProjectConfig::discover(&dir)?;
    if let Some(path) = database {
        config.database = DatabaseConfig::at(path);
    }

    tokio::runtime::Runtime::new()
        .context("failed to start async runtime")?
        .block_on(execute_command(config, cmd))
}

async fn execute_command(config: ProjectConfig, command: Command) -> Result<()> {
    let path = config.database_path();
    let use_case = Arc::new(TaskUseCase::new(move || {
        SqliteStore::open(&path)
            .with_context(|| format!("failed to open database {}", path.display()))
    }));
    let view_model = MainViewModel::new(Arc::clone(&use_case));

    let outcome = match command {
        Command::Shell => shell::run(&view_model, config.ui.retry_delay()).await,
        other => commands::run(other, &view_model).await,
    };

    view_model.shutdown().await;
    use_case.close().await?;
    outcome
}

fn install_tracing() {
    // RUST_LOG overrides the default INFO level. Logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
