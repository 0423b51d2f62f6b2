// Shell command action
// reason: tokio::process for async child management
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use dirqueue_core::port::{ActionResult, ActionStatus, ExecutionError, ItemAction, TimeProvider};

/// Runs a user-supplied shell command once per claimed item
///
/// The payload location is passed as the command's final argument, as a
/// positional parameter rather than spliced into the command text, so file
/// names with spaces or quotes reach the command intact. Output is inherited
/// so the operator sees it live.
pub struct ShellCommandAction {
    command: String,
    time_provider: Arc<dyn TimeProvider>,
    timeout: Option<Duration>,
}

impl ShellCommandAction {
    /// # Arguments
    /// * `command` - Shell command text, e.g. `cat` or `./handle.sh --verbose`
    /// * `time_provider` - Time provider for duration tracking
    /// * `timeout` - Kill the child and report `ActionStatus::Timeout` after this long
    pub fn new(
        command: impl Into<String>,
        time_provider: Arc<dyn TimeProvider>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            command: command.into(),
            time_provider,
            timeout,
        }
    }

    #[cfg(not(windows))]
    fn build(&self, payload: &Path) -> Command {
        // $0 = "dirqueue", $1 = payload path
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{} \"$1\"", self.command))
            .arg("dirqueue")
            .arg(payload);
        cmd
    }

    #[cfg(windows)]
    fn build(&self, payload: &Path) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&self.command).arg(payload);
        cmd
    }

    async fn spawn_and_wait(
        &self,
        payload: &Path,
    ) -> Result<Option<std::process::ExitStatus>, ExecutionError> {
        let mut child = self
            .build(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        let Some(limit) = self.timeout else {
            return child
                .wait()
                .await
                .map(Some)
                .map_err(|e| ExecutionError::IoError(e.to_string()));
        };

        match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => Ok(Some(status)),
            Ok(Err(e)) => Err(ExecutionError::IoError(e.to_string())),
            Err(_) => {
                let timeout_ms = limit.as_millis() as u64;
                warn!(command = %self.command, timeout_ms, "Action timed out, killing child");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out child");
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ItemAction for ShellCommandAction {
    async fn run(&self, payload: &Path) -> Result<ActionResult, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        info!(
            command = %self.command,
            payload = %payload.display(),
            timeout_ms = ?self.timeout.map(|t| t.as_millis() as u64),
            "Starting action"
        );

        let exit = self.spawn_and_wait(payload).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        let result = match exit {
            Some(status) => ActionResult {
                status: if status.success() {
                    ActionStatus::Success
                } else {
                    ActionStatus::Failed
                },
                duration_ms,
                // None when killed by a signal
                exit_code: status.code(),
            },
            None => ActionResult {
                status: ActionStatus::Timeout,
                duration_ms,
                exit_code: None,
            },
        };

        info!(
            command = %self.command,
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Action completed"
        );

        Ok(result)
    }
}
