// Central Error Type for the Queue

use crate::domain::{ItemId, ItemState};
use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Enqueue was given a path that is missing or not a regular file
    #[error("File '{}' not found", .0.display())]
    SourceNotFound(PathBuf),

    /// No pending items. A normal terminal condition, not a failure.
    #[error("Queue is empty")]
    QueueEmpty,

    /// Item absent from the state it was expected in (includes lost claim races)
    #[error("Item {id} not found in {state}")]
    NotFound { id: ItemId, state: ItemState },

    #[error("Item {id} already exists in {state}")]
    AlreadyExists { id: ItemId, state: ItemState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the error only means the item was not where the caller looked
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
