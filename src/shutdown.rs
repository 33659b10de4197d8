//! Cooperative stop flag shared by the pool, its sessions and the client.
//!
//! Flipping the flag is the only cancellation signal. Loops either poll
//! [`StopListener::is_stopped`] between steps or race
//! [`StopListener::stopped`] against an idle wait.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side of the flag. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StopFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl StopFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a [`StopFlag`].
#[derive(Debug, Clone)]
pub struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopListener {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop was requested (or every [`StopFlag`] is gone).
    ///
    /// Cancel safe.
    pub async fn stopped(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
