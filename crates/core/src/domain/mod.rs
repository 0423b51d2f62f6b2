// Domain Layer - Items, states and queue configuration

pub mod error;
pub mod item;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use item::{ItemId, ItemState, QueueItem};
pub use queue::QueueConfig;
