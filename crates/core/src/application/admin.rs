// Queue Admin - destructive operations gated by explicit confirmation

use crate::error::Result;
use crate::port::ItemStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Answer to "Are you sure you want to clear all queues?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearConfirmation {
    Confirmed,
    Declined,
}

impl ClearConfirmation {
    /// Interpret a typed reply; only `y` / `Y` confirms
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim() {
            "y" | "Y" => ClearConfirmation::Confirmed,
            _ => ClearConfirmation::Declined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared { removed: usize },
    Aborted,
}

pub struct QueueAdmin {
    store: Arc<dyn ItemStore>,
}

impl QueueAdmin {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Irreversibly empty all four states. Declined confirmation mutates nothing.
    pub async fn clear(&self, confirmation: ClearConfirmation) -> Result<ClearOutcome> {
        if confirmation != ClearConfirmation::Confirmed {
            info!("Clear declined");
            return Ok(ClearOutcome::Aborted);
        }

        let removed = self.store.clear().await?;
        warn!(removed, "All queues cleared");
        Ok(ClearOutcome::Cleared { removed })
    }
}
