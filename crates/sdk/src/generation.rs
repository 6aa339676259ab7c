//! Generation tokens with cancellation.
//!
//! Every request the engine issues is stamped with the value of a monotonic
//! counter. Advancing the counter cancels the previous stamp's token, so the
//! superseded transport future is dropped; the counter comparison at commit
//! time still rejects any response that raced past the cancellation.

use tokio_util::sync::CancellationToken;

/// Stamp handed to one request.
#[derive(Debug, Clone)]
pub struct Stamp {
    /// Counter value at issue time.
    pub generation: u64,
    /// Cancelled when a newer request supersedes this one, or on shutdown.
    pub token: CancellationToken,
}

/// Monotonic generation counter owning the token of the newest request.
///
/// One gate exists per request stream (list fetches, count queries) of a
/// session; gates are plain fields, never shared globals.
#[derive(Debug)]
pub struct GenerationGate {
    current: u64,
    in_flight: Option<CancellationToken>,
    root: CancellationToken,
}

impl GenerationGate {
    /// Creates a gate whose tokens are children of `root`.
    pub fn new(root: CancellationToken) -> Self {
        Self { current: 0, in_flight: None, root }
    }

    /// Bumps the counter, cancels the superseded request and stamps a new one.
    pub fn advance(&mut self) -> Stamp {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.current += 1;
        let token = self.root.child_token();
        self.in_flight = Some(token.clone());
        Stamp { generation: self.current, token }
    }

    /// Returns the current counter value.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Returns true if `generation` is the newest stamp issued.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.current
    }

    /// Releases the token of a request that completed while current.
    pub fn settle(&mut self, generation: u64) {
        if self.is_current(generation) {
            self.in_flight = None;
        }
    }

    /// Returns true if a current request has not settled yet.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}
