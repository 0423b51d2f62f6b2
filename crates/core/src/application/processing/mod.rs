// Processing Loop - claim, run action, record outcome

pub mod constants;
mod shutdown;

use constants::SYNTHETIC_FAILURE_EXIT_CODE;
pub use shutdown::{stop_channel, StopHandle, StopToken};

use crate::application::claim::Claimer;
use crate::application::state_machine::StateMachine;
use crate::domain::{ItemId, ItemState, QueueItem};
use crate::error::Result;
use crate::port::{ItemAction, ItemStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How the action ended for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed {
        exit_code: Option<i32>,
        reason: String,
    },
}

/// One item taken all the way to Done or Failed
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedItem {
    pub id: ItemId,
    pub original_name: String,
    pub outcome: ItemOutcome,
    pub final_state: ItemState,
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The run ended on a stop request rather than an empty queue
    pub stopped: bool,
}

/// Hooks for reporting progress (the CLI prints from these)
pub trait ProcessObserver: Send + Sync {
    fn on_claimed(&self, _item: &QueueItem) {}
    fn on_finished(&self, _item: &ProcessedItem) {}
}

struct SilentObserver;

impl ProcessObserver for SilentObserver {}

/// Strictly sequential processing of the queue
///
/// Never claims a second item before the current one reached Done or
/// Failed. Failed items are not retried.
pub struct ProcessingLoop {
    claimer: Claimer,
    machine: StateMachine,
    action: Arc<dyn ItemAction>,
    observer: Arc<dyn ProcessObserver>,
}

impl ProcessingLoop {
    pub fn new(store: Arc<dyn ItemStore>, action: Arc<dyn ItemAction>) -> Self {
        Self {
            claimer: Claimer::new(Arc::clone(&store)),
            machine: StateMachine::new(store),
            action,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProcessObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Process until no pending items remain (or a stop is requested)
    ///
    /// # Errors
    /// Store failures abort the run; the current item stays wherever it
    /// durably resides.
    pub async fn run(&self, stop: StopToken) -> Result<RunSummary> {
        info!("Processing run started");
        let mut summary = RunSummary::default();

        loop {
            if stop.is_stopped() {
                info!(processed = summary.processed, "Processing run stopped on request");
                summary.stopped = true;
                break;
            }

            let Some(processed) = self.process_next().await? else {
                break;
            };

            summary.processed += 1;
            match processed.outcome {
                ItemOutcome::Succeeded => summary.succeeded += 1,
                ItemOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Processing run finished"
        );
        Ok(summary)
    }

    /// Claim and finish one item. `None` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<ProcessedItem>> {
        let Some(item) = self.claimer.claim().await? else {
            return Ok(None);
        };
        self.observer.on_claimed(&item);

        info!(item_id = %item.id, path = %item.path.display(), "Processing item");
        let outcome = self.run_action(&item).await;

        let finished = match &outcome {
            ItemOutcome::Succeeded => self.machine.complete_success(&item.id).await?,
            ItemOutcome::Failed { .. } => self.machine.complete_failure(&item.id).await?,
        };

        let processed = ProcessedItem {
            original_name: finished.original_name,
            id: finished.id,
            outcome,
            final_state: finished.state,
        };
        self.observer.on_finished(&processed);
        Ok(Some(processed))
    }

    /// Run the action in its own task so a panic routes the item to Failed
    async fn run_action(&self, item: &QueueItem) -> ItemOutcome {
        let action = Arc::clone(&self.action);
        let path = item.path.clone();
        let handle = tokio::task::spawn(async move { action.run(&path).await });

        match handle.await {
            Ok(Ok(result)) if result.is_success() => {
                info!(item_id = %item.id, duration_ms = result.duration_ms, "Action succeeded");
                ItemOutcome::Succeeded
            }
            Ok(Ok(result)) => {
                warn!(
                    item_id = %item.id,
                    exit_code = ?result.exit_code,
                    status = ?result.status,
                    "Action failed"
                );
                ItemOutcome::Failed {
                    exit_code: result.exit_code,
                    reason: format!("action reported {:?}", result.status),
                }
            }
            Ok(Err(e)) => {
                error!(item_id = %item.id, error = %e, "Action could not run");
                ItemOutcome::Failed {
                    exit_code: Some(SYNTHETIC_FAILURE_EXIT_CODE),
                    reason: e.to_string(),
                }
            }
            Err(join_err) => {
                error!(item_id = %item.id, error = ?join_err, "Action panicked");
                ItemOutcome::Failed {
                    exit_code: Some(SYNTHETIC_FAILURE_EXIT_CODE),
                    reason: "action panicked".to_string(),
                }
            }
        }
    }
}
