//! Cancel-and-replace debouncing of search edits.

use std::{future::Future, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Holds at most one pending action and fires it after a quiet period.
///
/// Scheduling a new action cancels the pending one outright; cancelled
/// actions never run.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: Mutex::new(None) }
    }

    /// Returns the quiet period.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Schedules `action` to run once the quiet period elapses.
    ///
    /// The returned task resolves to `true` if the action ran and `false` if
    /// it was cancelled first. Must be called within a tokio runtime.
    pub fn schedule<F>(&self, action: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
            tracing::debug!("pending debounced action replaced");
        }

        let quiet = self.quiet;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(quiet) => {
                    action.await;
                    true
                }
            }
        })
    }

    /// Cancels the pending action, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
    }
}
