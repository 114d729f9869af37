//! Session-scoped cancellation signal

use tokio::sync::watch;

/// One-shot cancellation flag shared by every task of a sync session
///
/// Cloning is cheap; all clones observe the same flag. Once triggered it
/// stays triggered.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Triggers the signal, waking every waiter
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has been triggered
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
