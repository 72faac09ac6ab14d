//! Cooperative pause signal.
//!
//! Pausing only stops stages from *starting* new work units; anything already
//! in flight runs to completion. It is deliberately separate from
//! cancellation, which may discard in-flight work.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side of a pause signal. Cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct PauseController {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for PauseController {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn pause(&self) {
        self.tx.send_replace(true);
    }

    pub fn resume(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// Hand out an observer for the stages of a run.
    pub fn token(&self) -> PauseToken {
        PauseToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of a pause signal, checked by stages between work units.
#[derive(Debug, Clone)]
pub struct PauseToken {
    rx: watch::Receiver<bool>,
}

impl PauseToken {
    /// A token that is never paused.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_paused(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve immediately when not paused, otherwise once resumed.
    ///
    /// If the controller is dropped while paused the token stays paused, so
    /// callers should race this against their cancellation token.
    pub async fn wait_while_paused(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|paused| !*paused).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
