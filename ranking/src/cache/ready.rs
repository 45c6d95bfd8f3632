//! One-shot readiness signal.

use tokio::sync::watch;

/// Set once when the startup scan finishes; never cleared.
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<bool>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark ready and wake every waiter. Later calls change nothing.
    pub fn resolve(&self) {
        self.tx.send_replace(true);
    }

    /// Wait until [`resolve`](Self::resolve) has been called; returns
    /// immediately afterwards.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
