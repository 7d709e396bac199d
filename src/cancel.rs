//! Cooperative cancellation for in-flight requests.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation token for a request.
///
/// The client creates one per logical call; callers can also pass their own
/// through the `signal` field of [`RequestOptions`](crate::RequestOptions).
/// Clones observe the same cancellation.
///
/// # Examples
///
/// ```
/// use fetchwell::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    notify: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            notify: Arc::new(tx),
        }
    }

    /// Cancel the operation.
    pub fn cancel(&self) {
        self.notify.send_replace(true);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.notify.borrow()
    }

    /// Wait for cancellation.
    pub async fn cancelled(&self) {
        let mut rx = self.notify.subscribe();
        while !*rx.borrow_and_update() {
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves when `token` or, if given, `signal` is cancelled.
pub(crate) async fn either_cancelled(token: &CancellationToken, signal: Option<&CancellationToken>) {
    match signal {
        Some(signal) => {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = signal.cancelled() => {}
            }
        }
        None => token.cancelled().await,
    }
}
