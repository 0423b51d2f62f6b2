// Port Layer - Interfaces for external dependencies

pub mod item_action;
pub mod item_store;
pub mod time_provider;

// Re-exports
pub use item_action::{ActionResult, ActionStatus, ExecutionError, ItemAction};
pub use item_store::ItemStore;
pub use time_provider::TimeProvider;
