use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A lightweight cancellation signal threaded through `Context`. Handlers
/// poll `is_cancelled()` or await `cancelled()` at safe points before making
/// further Slack API calls, so a hosting server can abort in-flight work
/// when its own client connection drops. Deliberately hand-rolled instead of
/// pulling in `tokio-util`'s `CancellationToken` — this needs only cancel
/// + observe, not the full token/child-token hierarchy that crate provides.
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already cancelled; otherwise waits for the
    /// next `cancel()` call.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}
