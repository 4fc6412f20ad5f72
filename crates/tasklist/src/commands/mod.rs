//! One-shot command handlers.
//!
//! Each handler drives the view model through intents exactly like the
//! interactive shell does, then waits for the state it needs.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tasklist_app::MainViewModel;
use tasklist_core::{Resource, Task, TaskId, TaskIntent, TaskState};

use crate::{Command, LsFormat, render};

const STATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a non-interactive command.
pub async fn run(command: Command, view_model: &MainViewModel) -> Result<()> {
    match command {
        Command::Add { title, description } => handle_add(view_model, title, description).await,
        Command::Update {
            id,
            title,
            description,
            clear_description,
            completed,
        } => {
            let description = match (description, clear_description) {
                (_, true) => DescriptionEdit::Clear,
                (Some(text), false) => DescriptionEdit::Replace(text),
                (None, false) => DescriptionEdit::Keep,
            };
            handle_update(view_model, id, title, description, completed).await
        }
        Command::Check { id } => handle_check(view_model, id).await,
        Command::Delete { id } => handle_delete(view_model, id).await,
        Command::Ls { query, format } => handle_ls(view_model, query.unwrap_or_default(), format).await,
        Command::Shell => bail!("shell is not a one-shot command"),
    }
}

async fn handle_add(view_model: &MainViewModel, title: String, description: Option<String>) -> Result<()> {
    if title.trim().is_empty() {
        bail!("title must not be empty");
    }
    let state = dispatch_and_wait(view_model, TaskIntent::AddTask { title, description }).await?;
    print_state(&state)
}

/// What `update` does with the stored description.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DescriptionEdit {
    Keep,
    Replace(String),
    Clear,
}

async fn handle_update(
    view_model: &MainViewModel,
    id: TaskId,
    title: String,
    description: DescriptionEdit,
    completed: Option<bool>,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("title must not be empty");
    }
    let listed = dispatch_and_wait(view_model, search_all()).await?;
    let current = find_task(&listed, id).with_context(|| format!("Task not found: {id}"))?;
    let task = Task {
        id,
        title,
        description: match description {
            DescriptionEdit::Keep => current.description.clone(),
            DescriptionEdit::Replace(text) => Some(text),
            DescriptionEdit::Clear => None,
        },
        is_completed: completed.unwrap_or(current.is_completed),
    };
    let state = dispatch_and_wait(view_model, TaskIntent::UpdateTask { task }).await?;
    print_state(&state)
}

async fn handle_check(view_model: &MainViewModel, id: TaskId) -> Result<()> {
    let listed = dispatch_and_wait(view_model, search_all()).await?;
    if find_task(&listed, id).is_none() {
        bail!("Task not found: {id}");
    }
    view_model.process_intent(TaskIntent::CheckTask { id });
    let state = dispatch_and_wait(view_model, search_all()).await?;
    print_state(&state)
}

async fn handle_delete(view_model: &MainViewModel, id: TaskId) -> Result<()> {
    let listed = dispatch_and_wait(view_model, search_all()).await?;
    if find_task(&listed, id).is_none() {
        bail!("Task not found: {id}");
    }
    view_model.process_intent(TaskIntent::DeleteTask { id });
    let state = dispatch_and_wait(view_model, search_all()).await?;
    print_state(&state)
}

async fn handle_ls(view_model: &MainViewModel, query: String, format: LsFormat) -> Result<()> {
    let state = dispatch_and_wait(view_model, TaskIntent::SearchTask { query }).await?;
    match format {
        LsFormat::Table => print_state(&state),
        LsFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
    }
}

/// Send `intent` and wait for the next successful state it produces.
///
/// An error state published after the intent is returned as an error.
pub async fn dispatch_and_wait(view_model: &MainViewModel, intent: TaskIntent) -> Result<TaskState> {
    let mut states = view_model.state();
    states.borrow_and_update();
    let name = intent.name();
    view_model.process_intent(intent);

    let wait = async {
        loop {
            states
                .changed()
                .await
                .context("view model stopped before publishing a state")?;
            match &*states.borrow_and_update() {
                Resource::Success(state) => return Ok(state.clone()),
                Resource::Error(message) => bail!("{message}"),
                Resource::Empty | Resource::Loading => {}
            }
        }
    };
    tokio::time::timeout(STATE_TIMEOUT, wait)
        .await
        .with_context(|| format!("timed out waiting for {name} to finish"))?
}

fn search_all() -> TaskIntent {
    TaskIntent::SearchTask { query: String::new() }
}

fn find_task(state: &TaskState, id: TaskId) -> Option<&Task> {
    state
        .pending_tasks
        .iter()
        .chain(&state.finished_tasks)
        .find(|task| task.id == id)
}

fn print_state(state: &TaskState) -> Result<()> {
    let mut out = io::stdout().lock();
    render::write_state(&mut out, state)?;
    out.flush()?;
    Ok(())
}
