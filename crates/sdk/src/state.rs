//! Load-state machine of a list session.
//!
//! ```text
//!            ResetStarted                 Committed
//!   ┌──────┐ ─────────────► ┌─────────┐ ─────────────► ┌──────┐
//!   │ Idle │                │ Loading │                │ Idle │
//!   └──────┘ ◄───────────── └─────────┘                └──────┘
//!      │      Superseded         │ Failed
//!      │ LoadMoreStarted         ▼
//!      ▼                    ┌───────┐  ResetStarted / LoadMoreStarted
//! ┌─────────────┐  Failed   │ Error │ ──────────────────────────────►
//! │ LoadingMore │ ────────► └───────┘
//! └─────────────┘
//! ```
//!
//! `Superseded` leaves the state to whichever fetch replaced the stale one;
//! it never changes the state by itself. `Cancelled` (shutdown while a fetch
//! is current) returns to `Idle`.

use std::fmt;

/// Lifecycle of the current query's fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// First page of a new query in flight; the list is empty.
    Loading,
    /// A follow-up page in flight; accumulated records stay visible.
    LoadingMore,
    /// The last fetch failed.
    Error,
}

/// Transition triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadEvent {
    /// A reset fetch was issued.
    ResetStarted,
    /// A "load more" fetch was issued.
    LoadMoreStarted,
    /// The current fetch committed a page.
    Committed,
    /// The current fetch failed.
    Failed,
    /// A stale response was discarded.
    Superseded,
    /// The current fetch was cancelled without a newer one replacing it.
    Cancelled,
}

impl LoadState {
    /// Applies an event and returns the next state.
    #[must_use]
    pub fn apply(self, event: LoadEvent) -> Self {
        match (self, event) {
            (_, LoadEvent::ResetStarted) => Self::Loading,
            // A page request never downgrades a running reset.
            (Self::Loading, LoadEvent::LoadMoreStarted) => Self::Loading,
            (_, LoadEvent::LoadMoreStarted) => Self::LoadingMore,
            (_, LoadEvent::Committed) => Self::Idle,
            (_, LoadEvent::Failed) => Self::Error,
            (state, LoadEvent::Superseded) => state,
            (_, LoadEvent::Cancelled) => Self::Idle,
        }
    }

    /// True while a fetch for the current query is in flight.
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::LoadingMore => write!(f, "loading_more"),
            Self::Error => write!(f, "error"),
        }
    }
}
