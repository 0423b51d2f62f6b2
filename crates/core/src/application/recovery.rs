// Crash recovery (operator-driven)
use crate::domain::{ItemState, QueueItem};
use crate::error::Result;
use crate::port::ItemStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a stuck Processing item should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTarget {
    /// Back to Pending, to be claimed again
    Pending,
    /// Give up on it
    Failed,
}

impl RecoveryTarget {
    fn state(self) -> ItemState {
        match self {
            RecoveryTarget::Pending => ItemState::Pending,
            RecoveryTarget::Failed => ItemState::Failed,
        }
    }
}

/// Recovery service
///
/// An item left in Processing after a crash is never reclaimed
/// automatically. These moves sit outside the state machine's table and
/// only run when an operator asks for them.
pub struct RecoveryService {
    store: Arc<dyn ItemStore>,
}

impl RecoveryService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Move every Processing item to `target`
    ///
    /// Must not run while a processing loop is active on the same root: a
    /// live item would be pulled out from under its action.
    ///
    /// # Returns
    /// Items moved
    pub async fn recover_processing(&self, target: RecoveryTarget) -> Result<Vec<QueueItem>> {
        info!(target = ?target, "Starting recovery of processing items");
        let moved = self.move_all(ItemState::Processing, target.state()).await?;
        info!(recovered_count = moved.len(), "Processing recovery complete");
        Ok(moved)
    }

    /// Resubmit every Failed item to Pending
    pub async fn requeue_failed(&self) -> Result<Vec<QueueItem>> {
        let moved = self.move_all(ItemState::Failed, ItemState::Pending).await?;
        info!(requeued_count = moved.len(), "Failed items requeued");
        Ok(moved)
    }

    async fn move_all(&self, from: ItemState, to: ItemState) -> Result<Vec<QueueItem>> {
        let mut moved = Vec::new();
        for item in self.store.list(from).await? {
            match self.store.relocate(&item.id, from, to).await {
                Ok(item) => {
                    info!(item_id = %item.id, from = %from, to = %to, "Item recovered");
                    moved.push(item);
                }
                Err(e) if e.is_not_found() => {
                    warn!(item_id = %item.id, "Item vanished during recovery, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemId;
    use crate::port::item_store::mocks::InMemoryItemStore;

    async fn store_with(state: ItemState, names: &[&str]) -> Arc<InMemoryItemStore> {
        let store = Arc::new(InMemoryItemStore::new());
        for name in names {
            store.put(state, &ItemId::parse(*name).unwrap(), b"").await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_stuck_items_return_to_pending() {
        let store = store_with(ItemState::Processing, &["001_a", "002_b"]).await;
        let recovery = RecoveryService::new(store.clone());

        let moved = recovery
            .recover_processing(RecoveryTarget::Pending)
            .await
            .unwrap();

        assert_eq!(moved.len(), 2);
        assert!(moved.iter().all(|item| item.state == ItemState::Pending));
        assert_eq!(store.count(ItemState::Processing).await.unwrap(), 0);
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stuck_items_can_be_forced_to_failed() {
        let store = store_with(ItemState::Processing, &["001_a"]).await;
        let recovery = RecoveryService::new(store.clone());

        recovery
            .recover_processing(RecoveryTarget::Failed)
            .await
            .unwrap();

        assert_eq!(store.count(ItemState::Failed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_requeue_failed_leaves_done_alone() {
        let store = store_with(ItemState::Failed, &["001_a"]).await;
        store
            .put(ItemState::Done, &ItemId::parse("000_z").unwrap(), b"")
            .await
            .unwrap();
        let recovery = RecoveryService::new(store.clone());

        let moved = recovery.requeue_failed().await.unwrap();

        assert_eq!(moved.len(), 1);
        assert_eq!(store.count(ItemState::Pending).await.unwrap(), 1);
        assert_eq!(store.count(ItemState::Done).await.unwrap(), 1);
    }
}
