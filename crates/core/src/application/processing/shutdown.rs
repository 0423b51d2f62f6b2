// Stop signal for a processing run

use tokio::sync::watch;

/// Observed by the loop between items; a running action is never interrupted
#[derive(Clone)]
pub struct StopToken {
    rx: Option<watch::Receiver<bool>>,
}

impl StopToken {
    /// A token that never fires (run until the queue drains)
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Check if a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Requests a stop after the current item
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a stop channel
pub fn stop_channel() -> (StopHandle, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopToken { rx: Some(rx) })
}
