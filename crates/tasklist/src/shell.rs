//! Interactive shell over the view model.
//!
//! Every rendered frame comes from the published state; input lines are
//! turned into intents and nothing else touches the store.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use tasklist_app::MainViewModel;
use tasklist_core::{InvalidTaskId, Resource, Task, TaskId, TaskIntent, TaskState};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::render;

const HELP: &str = "\
Commands:
  add <title> [description]         create a pending task
  edit <id> <title> [description]   replace title and description
  check <id>                        toggle completion
  delete <id>                       remove a task
  search [query]                    filter by title (no query lists all)
  toggle-finished                   collapse or expand finished tasks
  toggle-pending                    collapse or expand pending tasks
  show                              print the current state
  help                              print this help
  quit                              leave the shell";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Forward an intent to the view model.
    Intent(TaskIntent),
    /// Print the latest state again.
    Show,
    /// Print usage.
    Help,
    /// Leave the shell.
    Quit,
    /// Blank line.
    Nothing,
}

/// Reasons an input line was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Unbalanced quotes and similar tokenizer failures.
    #[error("could not split input: {0}")]
    Tokenize(String),
    /// Unknown command word.
    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),
    /// Wrong number of arguments.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Id argument that is not a non-negative integer.
    #[error(transparent)]
    InvalidId(#[from] InvalidTaskId),
    /// Title argument that is blank.
    #[error("title must not be empty")]
    EmptyTitle,
    /// `edit` target not present in the rendered list.
    #[error("task #{0} is not in the current list")]
    NotListed(TaskId),
}

/// Parse an input line against the currently rendered state.
///
/// `edit` needs the listed task to keep its completion flag.
pub fn parse_line(line: &str, current: &Resource<TaskState>) -> Result<ShellCommand, ParseError> {
    let words = shell_words::split(line).map_err(|err| ParseError::Tokenize(err.to_string()))?;
    let Some((command, args)) = words.split_first() else {
        return Ok(ShellCommand::Nothing);
    };

    let intent = match (command.as_str(), args) {
        ("add", [title, rest @ ..]) if rest.len() <= 1 => TaskIntent::AddTask {
            title: non_blank(title)?,
            description: rest.first().cloned(),
        },
        ("add", _) => return Err(ParseError::Usage("add <title> [description]")),
        ("edit", [id, title, rest @ ..]) if rest.len() <= 1 => {
            let id: TaskId = id.parse()?;
            let listed = current
                .as_success()
                .and_then(|state| listed_task(state, id))
                .ok_or(ParseError::NotListed(id))?;
            TaskIntent::UpdateTask {
                task: Task {
                    id,
                    title: non_blank(title)?,
                    description: rest.first().cloned(),
                    is_completed: listed.is_completed,
                },
            }
        }
        ("edit", _) => return Err(ParseError::Usage("edit <id> <title> [description]")),
        ("check", [id]) => TaskIntent::CheckTask { id: id.parse()? },
        ("check", _) => return Err(ParseError::Usage("check <id>")),
        ("delete" | "rm", [id]) => TaskIntent::DeleteTask { id: id.parse()? },
        ("delete" | "rm", _) => return Err(ParseError::Usage("delete <id>")),
        ("search", []) => TaskIntent::SearchTask { query: String::new() },
        ("search", [query]) => TaskIntent::SearchTask { query: query.clone() },
        ("search", _) => return Err(ParseError::Usage("search [query]")),
        ("toggle-finished", []) => TaskIntent::ToggleFinishedTasks,
        ("toggle-pending", []) => TaskIntent::TogglePendingTasks,
        ("show", []) => return Ok(ShellCommand::Show),
        ("help", _) => return Ok(ShellCommand::Help),
        ("quit" | "exit", []) => return Ok(ShellCommand::Quit),
        (other, _) => return Err(ParseError::UnknownCommand(other.to_owned())),
    };
    Ok(ShellCommand::Intent(intent))
}

fn non_blank(title: &str) -> Result<String, ParseError> {
    if title.trim().is_empty() {
        Err(ParseError::EmptyTitle)
    } else {
        Ok(title.to_owned())
    }
}

fn listed_task(state: &TaskState, id: TaskId) -> Option<&Task> {
    state
        .pending_tasks
        .iter()
        .chain(&state.finished_tasks)
        .find(|task| task.id == id)
}

/// Run the shell until `quit` or end of input.
///
/// The full list is requested on start. Whenever an error state is
/// rendered the last search is reissued after `retry_delay`.
pub async fn run(view_model: &MainViewModel, retry_delay: Duration) -> Result<()> {
    let mut lines = spawn_stdin_reader();
    let mut states = view_model.state();
    let mut last_query = String::new();
    let mut retry_at: Option<Instant> = None;

    view_model.process_intent(TaskIntent::SearchTask {
        query: last_query.clone(),
    });

    loop {
        let deadline = retry_at.unwrap_or_else(Instant::now);
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let current = view_model.current();
                match parse_line(&line, &current) {
                    Ok(ShellCommand::Intent(intent)) => {
                        if let TaskIntent::SearchTask { query } = &intent {
                            last_query.clone_from(query);
                        }
                        retry_at = None;
                        view_model.process_intent(intent);
                    }
                    Ok(ShellCommand::Show) => print_resource(&current)?,
                    Ok(ShellCommand::Help) => println!("{HELP}"),
                    Ok(ShellCommand::Quit) => break,
                    Ok(ShellCommand::Nothing) => {}
                    Err(err) => eprintln!("{err}"),
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let resource = states.borrow_and_update().clone();
                print_resource(&resource)?;
                if resource.error_message().is_some() {
                    tracing::info!(delay = ?retry_delay, query = %last_query, "scheduling search retry");
                    retry_at = Some(Instant::now() + retry_delay);
                }
            }
            () = tokio::time::sleep_until(deadline), if retry_at.is_some() => {
                retry_at = None;
                view_model.process_intent(TaskIntent::SearchTask {
                    query: last_query.clone(),
                });
            }
        }
    }
    Ok(())
}

fn print_resource(resource: &Resource<TaskState>) -> Result<()> {
    let mut out = io::stdout().lock();
    render::write_resource(&mut out, resource)?;
    out.flush()?;
    Ok(())
}

/// Read stdin on a plain thread; the channel closes at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
