// Application Layer - Use Cases

pub mod admin;
pub mod claim;
pub mod enqueue;
pub mod inspect;
pub mod processing;
pub mod recovery;
pub mod service;
pub mod state_machine;

// Re-exports
pub use admin::{ClearConfirmation, ClearOutcome, QueueAdmin};
pub use claim::Claimer;
pub use enqueue::Enqueuer;
pub use inspect::{Inspector, QueueCounts, QueueListing};
pub use processing::{
    stop_channel, ItemOutcome, ProcessObserver, ProcessedItem, ProcessingLoop, RunSummary,
    StopHandle, StopToken,
};
pub use recovery::{RecoveryService, RecoveryTarget};
pub use service::QueueService;
pub use state_machine::{StateMachine, Transition};
