//! Intent reducer owning the observable UI state.
//!
//! Intents are queued on an unbounded channel and applied strictly in order
//! by a single worker task, so read-modify-write on the current state never
//! races. Results of the active live query arrive on a second channel tagged
//! with the subscription generation; emissions from a replaced subscription
//! are dropped.

use std::sync::Arc;

use tasklist_core::{Resource, Task, TaskIntent, TaskState};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::live_query::TaskQuery;
use crate::task_store::TaskStore;
use crate::task_use_case::{TaskUseCase, UseCaseError};

/// Failures the reducer logs instead of publishing.
#[derive(Debug, Error)]
pub enum ViewModelError {
    /// A toggle intent arrived while no list was displayed.
    #[error("cannot apply {intent} while state is {state}")]
    InvalidStateTransition {
        /// Name of the rejected intent.
        intent: &'static str,
        /// Label of the state it was applied to.
        state: &'static str,
    },

    /// A store command failed.
    #[error("{intent} failed: {source}")]
    Mutation {
        /// Name of the failing intent.
        intent: &'static str,
        /// Underlying repository error.
        #[source]
        source: UseCaseError,
    },
}

/// Handle to the reducer.
///
/// Dropping every handle stops the worker and cancels the live query.
/// Must be created inside a Tokio runtime.
pub struct MainViewModel {
    intents: mpsc::UnboundedSender<TaskIntent>,
    state: watch::Receiver<Resource<TaskState>>,
    worker: JoinHandle<()>,
}

impl MainViewModel {
    /// Start the reducer on top of `use_case`, opening the store in the background.
    #[must_use]
    pub fn new<S: TaskStore>(use_case: Arc<TaskUseCase<S>>) -> Self {
        let (intents, intent_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(Resource::Empty);
        let reducer = Reducer::new(use_case, state_tx);
        let worker = tokio::spawn(reducer.run(intent_rx));
        Self {
            intents,
            state,
            worker,
        }
    }

    /// Queue an intent. Effects are observed through [`state`](Self::state).
    pub fn process_intent(&self, intent: TaskIntent) {
        let name = intent.name();
        if self.intents.send(intent).is_err() {
            warn!(intent = name, "Reducer stopped; dropping intent");
        }
    }

    /// Subscribe to state changes. The receiver starts at the latest value.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<Resource<TaskState>> {
        self.state.clone()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn current(&self) -> Resource<TaskState> {
        self.state.borrow().clone()
    }

    /// Process every queued intent, then stop the worker.
    pub async fn shutdown(self) {
        let Self { intents, worker, .. } = self;
        drop(intents);
        if let Err(err) = worker.await {
            error!(error = %err, "Reducer worker ended abnormally");
        }
    }
}

struct Emission {
    generation: u64,
    query: TaskQuery,
    result: Result<Vec<Task>, String>,
}

struct Subscription {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Reducer<S> {
    use_case: Arc<TaskUseCase<S>>,
    state: watch::Sender<Resource<TaskState>>,
    emissions_tx: mpsc::UnboundedSender<Emission>,
    emissions_rx: mpsc::UnboundedReceiver<Emission>,
    subscription: Option<Subscription>,
    generation: u64,
}

impl<S: TaskStore> Reducer<S> {
    fn new(use_case: Arc<TaskUseCase<S>>, state: watch::Sender<Resource<TaskState>>) -> Self {
        let (emissions_tx, emissions_rx) = mpsc::unbounded_channel();
        Self {
            use_case,
            state,
            emissions_tx,
            emissions_rx,
            subscription: None,
            generation: 0,
        }
    }

    async fn run(mut self, mut intents: mpsc::UnboundedReceiver<TaskIntent>) {
        if let Err(err) = self.use_case.init_db().await {
            error!(error = %err, "Failed to open task store");
        }

        loop {
            tokio::select! {
                biased;
                intent = intents.recv() => match intent {
                    Some(intent) => self.apply(intent).await,
                    None => break,
                },
                Some(emission) = self.emissions_rx.recv() => self.on_emission(emission),
            }
        }

        self.cancel_subscription();
        debug!("Reducer stopped");
    }

    async fn apply(&mut self, intent: TaskIntent) {
        let name = intent.name();
        debug!(intent = name, "Processing intent");
        match intent {
            TaskIntent::AddTask { title, description } => {
                self.publish(Resource::Loading);
                let result = self.use_case.add_task(Task::new(title, description)).await;
                log_mutation(name, result.map(|_| ()));
                self.subscribe(TaskQuery::All);
            }
            TaskIntent::UpdateTask { task } => {
                self.publish(Resource::Loading);
                let result = self.use_case.update_task(task).await;
                log_mutation(name, result.map(|_| ()));
                self.subscribe(TaskQuery::All);
            }
            TaskIntent::DeleteTask { id } => {
                let result = self.use_case.delete_task(id).await;
                log_mutation(name, result.map(|_| ()));
            }
            TaskIntent::CheckTask { id } => {
                let result = self.use_case.check_task(id).await;
                log_mutation(name, result.map(|_| ()));
            }
            TaskIntent::SearchTask { query } => self.subscribe(TaskQuery::Search(query)),
            TaskIntent::ToggleFinishedTasks => self.toggle(name, TaskState::toggle_finished),
            TaskIntent::TogglePendingTasks => self.toggle(name, TaskState::toggle_pending),
        }
    }

    fn toggle(&self, intent: &'static str, flip: fn(&TaskState) -> TaskState) {
        let next = match &*self.state.borrow() {
            Resource::Success(current) => Ok(flip(current)),
            other => Err(ViewModelError::InvalidStateTransition {
                intent,
                state: other.label(),
            }),
        };
        match next {
            Ok(next) => self.publish(Resource::Success(next)),
            Err(err) => warn!(error = %err, "Ignoring intent"),
        }
    }

    fn publish(&self, resource: Resource<TaskState>) {
        debug!(state = resource.label(), "Publishing state");
        self.state.send_replace(resource);
    }

    fn cancel_subscription(&mut self) {
        if let Some(previous) = self.subscription.take() {
            debug!(generation = previous.generation, "Cancelling live query");
            previous.handle.abort();
        }
    }

    /// Replace the active live query with `query`.
    fn subscribe(&mut self, query: TaskQuery) {
        self.cancel_subscription();
        self.generation += 1;
        let generation = self.generation;
        let use_case = Arc::clone(&self.use_case);
        let emissions = self.emissions_tx.clone();

        let handle = tokio::spawn(async move {
            let mut live = match use_case.live(query.clone()).await {
                Ok(live) => live,
                Err(err) => {
                    let emission = Emission {
                        generation,
                        query,
                        result: Err(err.to_string()),
                    };
                    if emissions.send(emission).is_err() {
                        debug!(generation, "Reducer gone before live query failure was delivered");
                    }
                    return;
                }
            };
            while let Some(result) = live.next().await {
                let emission = Emission {
                    generation,
                    query: live.query().clone(),
                    result: result.map_err(|err| err.to_string()),
                };
                if emissions.send(emission).is_err() {
                    break;
                }
            }
        });

        self.subscription = Some(Subscription { generation, handle });
    }

    fn on_emission(&self, emission: Emission) {
        if emission.generation != self.generation {
            debug!(
                stale = emission.generation,
                current = self.generation,
                "Dropping emission from replaced live query"
            );
            return;
        }
        match emission.result {
            Ok(tasks) => {
                let next = TaskState::from_tasks(tasks, emission.query.search_text());
                self.publish(Resource::Success(next));
            }
            Err(message) => {
                warn!(query = %emission.query, error = %message, "Live query failed");
                self.publish(Resource::Error(message));
            }
        }
    }
}

fn log_mutation(intent: &'static str, result: Result<(), UseCaseError>) {
    if let Err(source) = result {
        let err = ViewModelError::Mutation { intent, source };
        error!(error = %err, "Store command failed");
    }
}
