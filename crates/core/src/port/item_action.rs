// Item Action Port
// Abstraction for the external work run against a claimed item

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Result of running an action against one payload
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// Action status (exit status zero is the only success)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Success,
    Failed,
    Timeout,
}

/// Errors raised while trying to run the action at all
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Item Action trait
///
/// Implementations:
/// - ShellCommandAction (infra-system): runs a shell command with the path
/// - mocks::MockItemAction: scripted outcomes for tests
#[async_trait]
pub trait ItemAction: Send + Sync {
    /// Run the action with the claimed payload location as its sole argument
    ///
    /// A non-zero exit is an `Ok` result with `ActionStatus::Failed`; `Err` is
    /// reserved for failing to run the action at all.
    async fn run(&self, payload: &Path) -> Result<ActionResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Mock action behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit 0
        Success,
        /// Exit with the given non-zero code
        Exit(i32),
        /// Could not be started
        SpawnError(String),
        /// Panic (for panic isolation testing)
        Panic(String),
    }

    /// Mock Item Action for testing
    ///
    /// Plays queued behaviors first, then falls back to the default.
    pub struct MockItemAction {
        default: MockBehavior,
        script: Mutex<VecDeque<MockBehavior>>,
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl MockItemAction {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                script: Mutex::new(VecDeque::new()),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_exit(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }

        /// Outcomes for the next calls, in order
        pub fn scripted(behaviors: impl IntoIterator<Item = MockBehavior>) -> Self {
            let action = Self::new_success();
            action.script.lock().unwrap().extend(behaviors);
            action
        }

        pub fn call_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        /// Payload paths the action was invoked with
        pub fn seen_paths(&self) -> Vec<PathBuf> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ItemAction for MockItemAction {
        async fn run(&self, payload: &Path) -> Result<ActionResult, ExecutionError> {
            self.seen.lock().unwrap().push(payload.to_path_buf());

            let behavior = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());

            match behavior {
                MockBehavior::Success => Ok(ActionResult {
                    status: ActionStatus::Success,
                    duration_ms: 1,
                    exit_code: Some(0),
                }),
                MockBehavior::Exit(code) => Ok(ActionResult {
                    status: ActionStatus::Failed,
                    duration_ms: 1,
                    exit_code: Some(code),
                }),
                MockBehavior::SpawnError(msg) => Err(ExecutionError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg);
                }
            }
        }
    }
}
