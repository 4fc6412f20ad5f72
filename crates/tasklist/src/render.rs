//! Plain-text rendering of the list state.

use std::io::{self, Write};

use tasklist_core::{Resource, Task, TaskState};

/// Write both sections of `state`, collapsing hidden ones to their header.
pub fn write_state(out: &mut impl Write, state: &TaskState) -> io::Result<()> {
    if !state.search_query.is_empty() {
        writeln!(out, "Search: {:?}", state.search_query)?;
    }
    if state.is_empty() {
        return writeln!(out, "No tasks found");
    }
    write_section(out, "Pending", &state.pending_tasks, state.show_pending_tasks)?;
    write_section(out, "Finished", &state.finished_tasks, state.show_finished_tasks)
}

/// Write any resource state, including the transient ones.
pub fn write_resource(out: &mut impl Write, resource: &Resource<TaskState>) -> io::Result<()> {
    match resource {
        Resource::Empty => Ok(()),
        Resource::Loading => writeln!(out, "Loading..."),
        Resource::Success(state) => write_state(out, state),
        Resource::Error(message) => writeln!(out, "Error: {message}"),
    }
}

fn write_section(out: &mut impl Write, name: &str, tasks: &[Task], expanded: bool) -> io::Result<()> {
    if !expanded {
        return writeln!(out, "{name} ({}) [collapsed]", tasks.len());
    }
    writeln!(out, "{name} ({})", tasks.len())?;
    for task in tasks {
        write_task(out, task)?;
    }
    Ok(())
}

fn write_task(out: &mut impl Write, task: &Task) -> io::Result<()> {
    let mark = if task.is_completed { 'x' } else { ' ' };
    match task.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => writeln!(out, "  [{mark}] #{:<4} {}  ({description})", task.id, task.title),
        None => writeln!(out, "  [{mark}] #{:<4} {}", task.id, task.title),
    }
}
