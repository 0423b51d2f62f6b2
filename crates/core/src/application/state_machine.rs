// State Machine - legal transitions over the store's relocate primitive

use crate::domain::{DomainError, ItemId, ItemState, QueueItem};
use crate::error::Result;
use crate::port::ItemStore;
use std::sync::Arc;
use tracing::debug;

/// Named transitions of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Pending -> Processing
    Claim,
    /// Processing -> Done
    Succeed,
    /// Processing -> Failed
    Fail,
}

impl Transition {
    /// Look up the transition for a (from, to) pair
    pub fn between(from: ItemState, to: ItemState) -> std::result::Result<Self, DomainError> {
        match (from, to) {
            (ItemState::Pending, ItemState::Processing) => Ok(Transition::Claim),
            (ItemState::Processing, ItemState::Done) => Ok(Transition::Succeed),
            (ItemState::Processing, ItemState::Failed) => Ok(Transition::Fail),
            _ => Err(DomainError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    pub const fn from_state(self) -> ItemState {
        match self {
            Transition::Claim => ItemState::Pending,
            Transition::Succeed | Transition::Fail => ItemState::Processing,
        }
    }

    pub const fn to_state(self) -> ItemState {
        match self {
            Transition::Claim => ItemState::Processing,
            Transition::Succeed => ItemState::Done,
            Transition::Fail => ItemState::Failed,
        }
    }
}

/// Stateless enforcement of the transition table
///
/// Holds no state of its own; every legal transition is one
/// `ItemStore::relocate` call.
#[derive(Clone)]
pub struct StateMachine {
    store: Arc<dyn ItemStore>,
}

impl StateMachine {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Move `id` from `from` to `to` if the table allows it
    ///
    /// # Errors
    /// - DomainError::IllegalTransition for pairs outside the table
    /// - AppError::NotFound if `id` is not in `from`
    pub async fn apply(&self, id: &ItemId, from: ItemState, to: ItemState) -> Result<QueueItem> {
        let transition = Transition::between(from, to)?;
        self.perform(id, transition).await
    }

    /// Pending -> Processing
    pub async fn claim(&self, id: &ItemId) -> Result<QueueItem> {
        self.perform(id, Transition::Claim).await
    }

    /// Processing -> Done
    pub async fn complete_success(&self, id: &ItemId) -> Result<QueueItem> {
        self.perform(id, Transition::Succeed).await
    }

    /// Processing -> Failed
    pub async fn complete_failure(&self, id: &ItemId) -> Result<QueueItem> {
        self.perform(id, Transition::Fail).await
    }

    async fn perform(&self, id: &ItemId, transition: Transition) -> Result<QueueItem> {
        let item = self
            .store
            .relocate(id, transition.from_state(), transition.to_state())
            .await?;
        debug!(
            item_id = %id,
            from = %transition.from_state(),
            to = %transition.to_state(),
            "Item transitioned"
        );
        Ok(item)
    }
}
