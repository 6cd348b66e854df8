//! Readiness signalling.
//!
//! A [`ReadySignal`] is a cloneable, read-only view of whether the
//! documentation subprocess may be contacted. The matching [`ReadyTrigger`]
//! flips it exactly once.

use std::time::Duration;

use tokio::sync::watch;

/// Observes the readiness of the documentation subprocess.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

/// Marks a [`ReadySignal`] as ready.
#[derive(Debug)]
pub struct ReadyTrigger {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// A signal that is not ready yet, and the trigger that readies it.
    pub fn pending() -> (Self, ReadyTrigger) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, ReadyTrigger { tx })
    }

    /// A signal that is already ready.
    pub fn ready() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    /// Whether the subprocess may be contacted now.
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until ready.
    ///
    /// Returns `false` if the trigger was dropped without firing.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        let ready = rx.wait_for(|ready| *ready).await.is_ok();
        ready
    }

    /// Wait until ready, giving up after `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait())
            .await
            .unwrap_or(false)
    }
}

impl ReadyTrigger {
    /// Mark the signal ready. Readiness never reverts.
    pub fn fire(self) {
        self.tx.send_replace(true);
    }
}
