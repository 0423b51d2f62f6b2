// Claim Use Case - FIFO claim with race recovery

use crate::application::state_machine::StateMachine;
use crate::domain::{ItemId, ItemState, QueueItem};
use crate::error::{AppError, Result};
use crate::port::ItemStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hands the oldest pending item to exactly one caller
///
/// "Find oldest" and "relocate it" are two steps, so another claimer may win
/// the item in between. A lost relocate means "try the next one", never
/// "queue empty": `None` is only returned after a scan finds Pending empty.
pub struct Claimer {
    store: Arc<dyn ItemStore>,
    machine: StateMachine,
}

impl Claimer {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            machine: StateMachine::new(Arc::clone(&store)),
            store,
        }
    }

    /// Claim the oldest pending item, if any
    ///
    /// An item that also sits in Processing (left behind by hand or by a
    /// crash mid-recovery) cannot be claimed; it is skipped for the rest of
    /// this call and left in Pending for an operator.
    pub async fn claim(&self) -> Result<Option<QueueItem>> {
        let mut lost_races = 0usize;
        let mut blocked: HashSet<ItemId> = HashSet::new();
        loop {
            let candidates: Vec<QueueItem> = self
                .store
                .list(ItemState::Pending)
                .await?
                .into_iter()
                .filter(|item| !blocked.contains(&item.id))
                .collect();
            if candidates.is_empty() {
                debug!(lost_races, blocked = blocked.len(), "No claimable pending items");
                return Ok(None);
            }

            for candidate in candidates {
                match self.machine.claim(&candidate.id).await {
                    Ok(item) => {
                        info!(item_id = %item.id, lost_races, "Item claimed");
                        return Ok(Some(item));
                    }
                    Err(e) if e.is_not_found() => {
                        // Another claimer took it between list and relocate
                        lost_races += 1;
                        debug!(item_id = %candidate.id, "Lost claim race, trying next");
                    }
                    Err(AppError::AlreadyExists { .. }) => {
                        warn!(
                            item_id = %candidate.id,
                            "Item already present in processing, skipping"
                        );
                        blocked.insert(candidate.id);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    /// Like `claim`, but an empty queue is `AppError::QueueEmpty`
    pub async fn pop(&self) -> Result<QueueItem> {
        self.claim().await?.ok_or(AppError::QueueEmpty)
    }
}
