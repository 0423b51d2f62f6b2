// Queue Service - core use cases wired over one store

use crate::application::admin::{ClearConfirmation, ClearOutcome, QueueAdmin};
use crate::application::claim::Claimer;
use crate::application::enqueue::Enqueuer;
use crate::application::inspect::{Inspector, QueueCounts, QueueListing};
use crate::application::processing::ProcessingLoop;
use crate::application::recovery::{RecoveryService, RecoveryTarget};
use crate::application::state_machine::StateMachine;
use crate::domain::{ItemId, QueueItem};
use crate::error::Result;
use crate::port::{ItemAction, ItemStore, TimeProvider};
use std::path::Path;
use std::sync::Arc;

/// Facade over the queue components
pub struct QueueService {
    store: Arc<dyn ItemStore>,
    enqueuer: Enqueuer,
    claimer: Claimer,
    machine: StateMachine,
    inspector: Inspector,
    admin: QueueAdmin,
    recovery: RecoveryService,
}

impl QueueService {
    pub fn new(store: Arc<dyn ItemStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            enqueuer: Enqueuer::new(Arc::clone(&store), time_provider),
            claimer: Claimer::new(Arc::clone(&store)),
            machine: StateMachine::new(Arc::clone(&store)),
            inspector: Inspector::new(Arc::clone(&store)),
            admin: QueueAdmin::new(Arc::clone(&store)),
            recovery: RecoveryService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Create the state locations
    pub async fn init(&self) -> Result<()> {
        self.store.init().await
    }

    pub async fn enqueue(&self, source: &Path) -> Result<ItemId> {
        self.enqueuer.enqueue(source).await
    }

    pub async fn claim(&self) -> Result<Option<QueueItem>> {
        self.claimer.claim().await
    }

    pub async fn pop(&self) -> Result<QueueItem> {
        self.claimer.pop().await
    }

    pub async fn complete_success(&self, id: &ItemId) -> Result<QueueItem> {
        self.machine.complete_success(id).await
    }

    pub async fn complete_failure(&self, id: &ItemId) -> Result<QueueItem> {
        self.machine.complete_failure(id).await
    }

    pub async fn counts(&self) -> Result<QueueCounts> {
        self.inspector.counts().await
    }

    pub async fn list_all(&self) -> Result<QueueListing> {
        self.inspector.list_all().await
    }

    pub async fn peek_next(&self) -> Result<Option<QueueItem>> {
        self.inspector.peek_next().await
    }

    pub async fn clear(&self, confirmation: ClearConfirmation) -> Result<ClearOutcome> {
        self.admin.clear(confirmation).await
    }

    pub async fn recover_processing(&self, target: RecoveryTarget) -> Result<Vec<QueueItem>> {
        self.recovery.recover_processing(target).await
    }

    pub async fn requeue_failed(&self) -> Result<Vec<QueueItem>> {
        self.recovery.requeue_failed().await
    }

    /// A processing loop over this service's store
    pub fn processing_loop(&self, action: Arc<dyn ItemAction>) -> ProcessingLoop {
        ProcessingLoop::new(Arc::clone(&self.store), action)
    }
}
