// Queue Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Queue configuration
///
/// Resolved once by the caller and handed to every component that touches
/// the store. There is no process-wide default root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub root: PathBuf,
}

impl QueueConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
