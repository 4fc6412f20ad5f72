//! End-to-end tests of the intent reducer against an in-memory SQLite store.

#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use tasklist_app::{MainViewModel, TaskStore, TaskUseCase};
use tasklist_core::{Resource, Task, TaskId, TaskIntent, TaskState};
use tasklist_store_sqlite::SqliteStore;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Store wrapper whose queries and writes can be made to fail on demand.
struct FlakyStore {
    inner: SqliteStore,
    failing: AtomicBool,
    failing_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("open store"),
            failing: AtomicBool::new(false),
            failing_writes: AtomicBool::new(false),
        }
    }

    fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn fail_queries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("disk I/O error"));
        }
        Ok(())
    }
}

impl TaskStore for FlakyStore {
    type Error = anyhow::Error;

    fn add(&self, task: &Task) -> anyhow::Result<TaskId> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("database is locked"));
        }
        Ok(self.inner.add(task)?)
    }

    fn update(&self, task: &Task) -> anyhow::Result<bool> {
        Ok(self.inner.update(task)?)
    }

    fn delete(&self, id: TaskId) -> anyhow::Result<bool> {
        Ok(self.inner.delete(id)?)
    }

    fn toggle_complete(&self, id: TaskId) -> anyhow::Result<bool> {
        Ok(self.inner.toggle_complete(id)?)
    }

    fn list_all(&self) -> anyhow::Result<Vec<Task>> {
        self.check()?;
        Ok(self.inner.list_all()?)
    }

    fn search(&self, query: &str) -> anyhow::Result<Vec<Task>> {
        self.check()?;
        Ok(self.inner.search(query)?)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}

fn seeded_store(tasks: &[(i64, &str, bool)]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open store");
    for &(id, title, done) in tasks {
        let mut task = Task::new(title, None).with_id(TaskId(id));
        task.is_completed = done;
        store.add(&task).expect("seed task");
    }
    store
}

fn view_model_over(store: SqliteStore) -> MainViewModel {
    MainViewModel::new(Arc::new(TaskUseCase::with_store(store)))
}

fn flaky_view_model() -> (Arc<FlakyStore>, MainViewModel) {
    let store = Arc::new(FlakyStore::new());
    let use_case = Arc::new(TaskUseCase::new({
        let store = Arc::clone(&store);
        move || Ok(FlakyShared(Arc::clone(&store)))
    }));
    (store, MainViewModel::new(use_case))
}

async fn wait_until(
    view_model: &MainViewModel,
    predicate: impl FnMut(&Resource<TaskState>) -> bool,
) -> Resource<TaskState> {
    let mut rx = view_model.state();
    timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("state reached within timeout")
        .expect("reducer alive")
        .clone()
}

async fn wait_for_success(
    view_model: &MainViewModel,
    mut predicate: impl FnMut(&TaskState) -> bool,
) -> TaskState {
    let resource = wait_until(view_model, |resource| {
        resource.as_success().is_some_and(&mut predicate)
    })
    .await;
    resource.as_success().cloned().expect("success")
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.title.as_str()).collect()
}

#[tokio::test]
async fn starts_empty() {
    let view_model = view_model_over(seeded_store(&[]));
    assert_eq!(view_model.current(), Resource::Empty);
    view_model.shutdown().await;
}

#[tokio::test]
async fn add_task_on_empty_store_lists_it_as_pending() {
    let view_model = view_model_over(seeded_store(&[]));
    view_model.process_intent(TaskIntent::AddTask {
        title: "Buy milk".into(),
        description: None,
    });

    let state = wait_for_success(&view_model, |state| !state.is_empty()).await;
    assert_eq!(state.pending_tasks.len(), 1);
    let task = &state.pending_tasks[0];
    assert!(!task.id.is_unassigned());
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.description, None);
    assert!(!task.is_completed);
    assert!(state.finished_tasks.is_empty());
    assert_eq!(state.search_query, "");
}

#[tokio::test]
async fn check_task_moves_it_to_finished() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false), (2, "Task 2", true)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    wait_for_success(&view_model, |state| state.total() == 2).await;

    view_model.process_intent(TaskIntent::CheckTask { id: TaskId(1) });
    let state = wait_for_success(&view_model, |state| state.pending_tasks.is_empty()).await;
    let finished: Vec<_> = state.finished_tasks.iter().map(|task| task.id).collect();
    assert_eq!(finished, vec![TaskId(1), TaskId(2)]);
}

#[tokio::test]
async fn delete_task_re_emits_through_the_live_query() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false), (2, "Task 2", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    wait_for_success(&view_model, |state| state.total() == 2).await;

    view_model.process_intent(TaskIntent::DeleteTask { id: TaskId(1) });
    let state = wait_for_success(&view_model, |state| state.total() == 1).await;
    assert_eq!(titles(&state.pending_tasks), vec!["Task 2"]);
}

#[tokio::test]
async fn delete_of_missing_task_does_not_change_state() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    let before = wait_for_success(&view_model, |state| state.total() == 1).await;

    view_model.process_intent(TaskIntent::DeleteTask { id: TaskId(999) });
    view_model.process_intent(TaskIntent::SearchTask { query: "Task".into() });
    let after = wait_for_success(&view_model, |state| state.search_query == "Task").await;
    assert_eq!(after.pending_tasks, before.pending_tasks);
    assert_eq!(after.finished_tasks, before.finished_tasks);
}

#[tokio::test]
async fn search_filters_by_substring() {
    let view_model = view_model_over(seeded_store(&[
        (1, "Task 1", false),
        (2, "Task 2", false),
        (3, "Test", false),
    ]));
    view_model.process_intent(TaskIntent::SearchTask { query: "Ta".into() });

    let state = wait_for_success(&view_model, |state| state.search_query == "Ta").await;
    assert_eq!(titles(&state.pending_tasks), vec!["Task 1", "Task 2"]);
}

#[tokio::test]
async fn newer_search_replaces_older_one() {
    let view_model = view_model_over(seeded_store(&[(1, "Apple", false), (2, "Banana", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: "App".into() });
    view_model.process_intent(TaskIntent::SearchTask { query: "Ban".into() });

    let state = wait_for_success(&view_model, |state| state.search_query == "Ban").await;
    assert_eq!(titles(&state.pending_tasks), vec!["Banana"]);

    // A write must only refresh the latest subscription.
    view_model.process_intent(TaskIntent::CheckTask { id: TaskId(1) });
    view_model.process_intent(TaskIntent::CheckTask { id: TaskId(2) });
    let state = wait_for_success(&view_model, |state| !state.finished_tasks.is_empty()).await;
    assert_eq!(state.search_query, "Ban");
    assert_eq!(titles(&state.finished_tasks), vec!["Banana"]);
}

#[tokio::test]
async fn add_task_during_search_resets_to_the_full_list() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false), (2, "Chores", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: "Task".into() });
    wait_for_success(&view_model, |state| state.search_query == "Task").await;

    view_model.process_intent(TaskIntent::AddTask {
        title: "Groceries".into(),
        description: Some("eggs".into()),
    });
    let state = wait_for_success(&view_model, |state| state.total() == 3).await;
    assert_eq!(state.search_query, "");
    assert_eq!(titles(&state.pending_tasks), vec!["Task 1", "Chores", "Groceries"]);
}

#[tokio::test]
async fn update_task_overwrites_and_refreshes() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false)]));
    let mut task = Task::new("Updated Task", Some("Updated Description".into())).with_id(TaskId(1));
    task.is_completed = true;
    view_model.process_intent(TaskIntent::UpdateTask { task: task.clone() });

    let state = wait_for_success(&view_model, |state| !state.finished_tasks.is_empty()).await;
    assert_eq!(state.finished_tasks, vec![task]);
    assert!(state.pending_tasks.is_empty());
}

#[tokio::test]
async fn toggle_finished_twice_restores_the_state() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false), (2, "Task 2", true)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    let original = wait_for_success(&view_model, |state| state.total() == 2).await;
    assert!(original.show_finished_tasks);

    view_model.process_intent(TaskIntent::ToggleFinishedTasks);
    let collapsed = wait_for_success(&view_model, |state| !state.show_finished_tasks).await;
    assert_eq!(collapsed, original.toggle_finished());
    assert_eq!(collapsed.pending_tasks, original.pending_tasks);
    assert!(collapsed.show_pending_tasks);

    view_model.process_intent(TaskIntent::ToggleFinishedTasks);
    let restored = wait_for_success(&view_model, |state| state.show_finished_tasks).await;
    assert_eq!(restored, original);
}

#[tokio::test]
async fn toggle_pending_is_independent_of_finished() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    wait_for_success(&view_model, |state| state.total() == 1).await;

    view_model.process_intent(TaskIntent::TogglePendingTasks);
    let state = wait_for_success(&view_model, |state| !state.show_pending_tasks).await;
    assert!(state.show_finished_tasks);
}

#[tokio::test]
async fn toggle_before_any_result_is_ignored() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", true)]));
    view_model.process_intent(TaskIntent::ToggleFinishedTasks);
    view_model.process_intent(TaskIntent::TogglePendingTasks);
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });

    let state = wait_for_success(&view_model, |state| state.total() == 1).await;
    assert!(state.show_finished_tasks);
    assert!(state.show_pending_tasks);
}

#[tokio::test]
async fn query_errors_surface_and_reissuing_recovers() {
    let (store, view_model) = flaky_view_model();

    store.fail_queries(true);
    view_model.process_intent(TaskIntent::SearchTask { query: "Ta".into() });
    let resource = wait_until(&view_model, |resource| matches!(resource, Resource::Error(_))).await;
    assert_eq!(resource, Resource::Error("disk I/O error".into()));

    store.fail_queries(false);
    view_model.process_intent(TaskIntent::SearchTask { query: "Ta".into() });
    let state = wait_for_success(&view_model, |state| state.search_query == "Ta").await;
    assert!(state.is_empty());
}

#[tokio::test]
async fn failed_add_is_logged_and_the_reducer_keeps_working() {
    let (store, view_model) = flaky_view_model();

    store.fail_writes(true);
    view_model.process_intent(TaskIntent::AddTask {
        title: "Buy milk".into(),
        description: None,
    });
    let refreshed = wait_for_success(&view_model, |_| true).await;
    assert!(refreshed.is_empty());
    assert_eq!(refreshed.search_query, "");

    view_model.process_intent(TaskIntent::SearchTask { query: "q".into() });
    let searched = wait_for_success(&view_model, |state| state.search_query == "q").await;
    assert!(searched.is_empty());

    store.fail_writes(false);
    view_model.process_intent(TaskIntent::AddTask {
        title: "Buy milk".into(),
        description: None,
    });
    let state = wait_for_success(&view_model, |state| state.total() == 1).await;
    assert_eq!(titles(&state.pending_tasks), vec!["Buy milk"]);
}

#[tokio::test]
async fn collapsed_section_reopens_on_the_next_emission() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    wait_for_success(&view_model, |state| state.total() == 1).await;

    view_model.process_intent(TaskIntent::ToggleFinishedTasks);
    wait_for_success(&view_model, |state| !state.show_finished_tasks).await;

    view_model.process_intent(TaskIntent::CheckTask { id: TaskId(1) });
    let state = wait_for_success(&view_model, |state| !state.finished_tasks.is_empty()).await;
    assert!(state.show_finished_tasks);
    assert!(state.show_pending_tasks);
}

#[tokio::test]
async fn state_receivers_replay_the_latest_value() {
    let view_model = view_model_over(seeded_store(&[(1, "Task 1", false)]));
    view_model.process_intent(TaskIntent::SearchTask { query: String::new() });
    wait_for_success(&view_model, |state| state.total() == 1).await;

    let late = view_model.state();
    assert!(late.borrow().as_success().is_some());
}

/// Shares one [`FlakyStore`] between the test and the repository.
struct FlakyShared(Arc<FlakyStore>);

impl TaskStore for FlakyShared {
    type Error = anyhow::Error;

    fn add(&self, task: &Task) -> anyhow::Result<TaskId> {
        self.0.add(task)
    }

    fn update(&self, task: &Task) -> anyhow::Result<bool> {
        self.0.update(task)
    }

    fn delete(&self, id: TaskId) -> anyhow::Result<bool> {
        self.0.delete(id)
    }

    fn toggle_complete(&self, id: TaskId) -> anyhow::Result<bool> {
        self.0.toggle_complete(id)
    }

    fn list_all(&self) -> anyhow::Result<Vec<Task>> {
        self.0.list_all()
    }

    fn search(&self, query: &str) -> anyhow::Result<Vec<Task>> {
        self.0.search(query)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.subscribe()
    }
}
