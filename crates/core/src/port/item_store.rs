// Item Store Port (Interface)

use crate::domain::{ItemId, ItemState, QueueItem};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Durable home of queue items, one location per state
///
/// `relocate` is the only mutation of an existing item. It must be a single
/// atomic step: concurrent relocations of the same id yield exactly one
/// success, and the item is never visible in both states or in neither.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Create the state locations if missing
    async fn init(&self) -> Result<()>;

    /// Create an item
    ///
    /// # Errors
    /// - AppError::AlreadyExists if `id` is already present in `state`
    async fn put(&self, state: ItemState, id: &ItemId, payload: &[u8]) -> Result<QueueItem>;

    /// Atomically move an item between states
    ///
    /// # Errors
    /// - AppError::NotFound if `id` is absent from `from` (lost race included)
    /// - AppError::AlreadyExists if `id` is already present in `to`
    async fn relocate(&self, id: &ItemId, from: ItemState, to: ItemState) -> Result<QueueItem>;

    /// Items currently in `state`, ascending by id
    async fn list(&self, state: ItemState) -> Result<Vec<QueueItem>>;

    /// Number of items in `state`
    async fn count(&self, state: ItemState) -> Result<usize> {
        Ok(self.list(state).await?.len())
    }

    /// Where the payload of `id` lives while in `state`
    fn payload_path(&self, state: ItemState, id: &ItemId) -> PathBuf;

    /// Remove every item in every state. Returns the number removed.
    async fn clear(&self) -> Result<usize>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory store: one mutex makes every relocate atomic
    #[derive(Default)]
    pub struct InMemoryItemStore {
        items: Mutex<BTreeMap<ItemState, BTreeMap<ItemId, Vec<u8>>>>,
    }

    impl InMemoryItemStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Payload bytes of `id` in `state` (test inspection)
        pub fn payload(&self, state: ItemState, id: &ItemId) -> Option<Vec<u8>> {
            self.items
                .lock()
                .unwrap()
                .get(&state)
                .and_then(|items| items.get(id).cloned())
        }

        fn item(&self, state: ItemState, id: &ItemId, size: usize) -> QueueItem {
            QueueItem::new(id.clone(), state, size as u64, self.payload_path(state, id))
        }
    }

    #[async_trait]
    impl ItemStore for InMemoryItemStore {
        async fn init(&self) -> Result<()> {
            let mut items = self.items.lock().unwrap();
            for state in ItemState::ALL {
                items.entry(state).or_default();
            }
            Ok(())
        }

        async fn put(&self, state: ItemState, id: &ItemId, payload: &[u8]) -> Result<QueueItem> {
            {
                let mut items = self.items.lock().unwrap();
                let bucket = items.entry(state).or_default();
                if bucket.contains_key(id) {
                    return Err(AppError::AlreadyExists {
                        id: id.clone(),
                        state,
                    });
                }
                bucket.insert(id.clone(), payload.to_vec());
            }
            Ok(self.item(state, id, payload.len()))
        }

        async fn relocate(&self, id: &ItemId, from: ItemState, to: ItemState) -> Result<QueueItem> {
            let size = {
                let mut items = self.items.lock().unwrap();
                if !items.get(&from).is_some_and(|bucket| bucket.contains_key(id)) {
                    return Err(AppError::NotFound {
                        id: id.clone(),
                        state: from,
                    });
                }
                if items.get(&to).is_some_and(|bucket| bucket.contains_key(id)) {
                    return Err(AppError::AlreadyExists {
                        id: id.clone(),
                        state: to,
                    });
                }
                let payload = items
                    .get_mut(&from)
                    .and_then(|bucket| bucket.remove(id))
                    .unwrap_or_default();
                let size = payload.len();
                items.entry(to).or_default().insert(id.clone(), payload);
                size
            };
            Ok(self.item(to, id, size))
        }

        async fn list(&self, state: ItemState) -> Result<Vec<QueueItem>> {
            let snapshot: Vec<(ItemId, usize)> = self
                .items
                .lock()
                .unwrap()
                .get(&state)
                .map(|bucket| bucket.iter().map(|(id, p)| (id.clone(), p.len())).collect())
                .unwrap_or_default();

            Ok(snapshot
                .into_iter()
                .map(|(id, size)| self.item(state, &id, size))
                .collect())
        }

        fn payload_path(&self, state: ItemState, id: &ItemId) -> PathBuf {
            PathBuf::from("/memory")
                .join(state.dir_name())
                .join(id.as_str())
        }

        async fn clear(&self) -> Result<usize> {
            let mut items = self.items.lock().unwrap();
            let removed = items.values().map(|bucket| bucket.len()).sum();
            for bucket in items.values_mut() {
                bucket.clear();
            }
            Ok(removed)
        }
    }
}
