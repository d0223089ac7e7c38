//! One-shot cancellation signal shared by the coordinator and the injector

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Monotonic stop flag: once cancelled it never resets
#[derive(Debug, Clone)]
pub struct RunSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl RunSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the flag. Returns `true` only for the call that actually set it.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the flag is set
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns whether the signal is set when the sleep ends.
    pub async fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_cancelled(),
            _ = self.cancelled() => true,
        }
    }
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}
