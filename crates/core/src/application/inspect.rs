// Inspector - read-only queries over the four states

use crate::domain::{ItemState, QueueItem};
use crate::error::Result;
use crate::port::ItemStore;
use serde::Serialize;
use std::sync::Arc;

/// Cardinality of each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn get(&self, state: ItemState) -> usize {
        match state {
            ItemState::Pending => self.pending,
            ItemState::Processing => self.processing,
            ItemState::Done => self.done,
            ItemState::Failed => self.failed,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.failed
    }

    fn set(&mut self, state: ItemState, count: usize) {
        match state {
            ItemState::Pending => self.pending = count,
            ItemState::Processing => self.processing = count,
            ItemState::Done => self.done = count,
            ItemState::Failed => self.failed = count,
        }
    }
}

/// Items grouped by state, ascending by id within each group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueListing {
    pub pending: Vec<QueueItem>,
    pub processing: Vec<QueueItem>,
    pub done: Vec<QueueItem>,
    pub failed: Vec<QueueItem>,
}

impl QueueListing {
    pub fn items(&self, state: ItemState) -> &[QueueItem] {
        match state {
            ItemState::Pending => &self.pending,
            ItemState::Processing => &self.processing,
            ItemState::Done => &self.done,
            ItemState::Failed => &self.failed,
        }
    }

    fn items_mut(&mut self, state: ItemState) -> &mut Vec<QueueItem> {
        match state {
            ItemState::Pending => &mut self.pending,
            ItemState::Processing => &mut self.processing,
            ItemState::Done => &mut self.done,
            ItemState::Failed => &mut self.failed,
        }
    }
}

/// Read-only view of the queue. Never mutates the store.
pub struct Inspector {
    store: Arc<dyn ItemStore>,
}

impl Inspector {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    pub async fn counts(&self) -> Result<QueueCounts> {
        let mut counts = QueueCounts::default();
        for state in ItemState::ALL {
            counts.set(state, self.store.count(state).await?);
        }
        Ok(counts)
    }

    pub async fn list_all(&self) -> Result<QueueListing> {
        let mut listing = QueueListing::default();
        for state in ItemState::ALL {
            *listing.items_mut(state) = self.store.list(state).await?;
        }
        Ok(listing)
    }

    /// The item the next claim would try first
    ///
    /// Advisory only: a concurrent claimer may take it before the caller acts.
    pub async fn peek_next(&self) -> Result<Option<QueueItem>> {
        Ok(self.store.list(ItemState::Pending).await?.into_iter().next())
    }
}
