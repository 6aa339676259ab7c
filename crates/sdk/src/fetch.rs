//! List fetches stamped with generation tokens.
//!
//! The [`FetchCoordinator`] issues one [`FetchTicket`] per reset or page
//! request. A ticket carries the exact query it was issued for, its window
//! and a cancellation token; running it either yields the page or, when a
//! newer ticket superseded it first, nothing at all.

use tokio_util::sync::CancellationToken;
use tracklist_types::{Page, QueryState, Window};

use crate::{
    error::{FetchPhase, Result},
    generation::GenerationGate,
    service::RecordService,
};

/// Result of a reset or "load more" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was committed to the list.
    Committed {
        /// Records added (after dedup).
        added: usize,
        /// Whether more records may exist.
        has_more: bool,
    },
    /// A newer request replaced this one before it completed; nothing changed.
    Superseded,
    /// The query update left the query as it was; nothing was fetched.
    Unchanged,
    /// A fetch for the current query is already in flight.
    Busy,
    /// The list is known to be complete.
    Exhausted,
}

/// Issues generation-stamped list fetches.
#[derive(Debug)]
pub struct FetchCoordinator {
    gate: GenerationGate,
}

impl FetchCoordinator {
    /// Creates a coordinator whose fetches are cancelled with `root`.
    pub fn new(root: CancellationToken) -> Self {
        Self { gate: GenerationGate::new(root) }
    }

    /// Stamps a fetch of one page of `query` starting at `offset`.
    ///
    /// Any fetch still in flight is superseded and its token cancelled.
    pub fn begin(&mut self, phase: FetchPhase, query: &QueryState, offset: usize) -> FetchTicket {
        let stamp = self.gate.advance();
        FetchTicket {
            generation: stamp.generation,
            phase,
            query: query.clone(),
            window: query.window(offset),
            token: stamp.token,
        }
    }

    /// Returns true if `generation` belongs to the newest ticket.
    pub fn is_current(&self, generation: u64) -> bool {
        self.gate.is_current(generation)
    }

    /// Marks the current ticket as resolved.
    pub fn settle(&mut self, generation: u64) {
        self.gate.settle(generation);
    }

    /// Returns the generation of the newest ticket.
    pub fn generation(&self) -> u64 {
        self.gate.current()
    }
}

/// One issued list fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    phase: FetchPhase,
    query: QueryState,
    window: Window,
    token: CancellationToken,
}

impl FetchTicket {
    /// Generation stamp.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reset or append.
    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// The query the ticket was issued for.
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// Requested window.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Runs the fetch; `None` if the ticket was cancelled first.
    pub async fn run(&self, service: &dyn RecordService) -> Option<Result<Page>> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            result = fetch(service, &self.query, self.window) => Some(result),
        }
    }
}

/// Fetches one window of `query` from `service`.
///
/// When the service cannot search remotely, the returned rows are filtered
/// by the case-insensitive name/id substring here, preserving their order.
/// A reported total no longer describes the filtered rows in that case and is dropped.
pub async fn fetch(service: &dyn RecordService, query: &QueryState, window: Window) -> Result<Page> {
    let filter = query.filter();
    let mut page = service.query_collection(&filter, &query.sort(), window).await?;
    if !service.supports_remote_search() && filter.search_needle().is_some() {
        filter.retain_search_matches(&mut page.items);
        page.total = None;
    }
    tracing::trace!(
        offset = window.offset,
        limit = window.limit,
        returned = page.len(),
        total = ?page.total,
        "page fetched"
    );
    Ok(page)
}
