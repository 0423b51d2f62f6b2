// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
