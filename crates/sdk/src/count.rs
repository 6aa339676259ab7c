//! Best-effort total count of the current filter.
//!
//! Each reset issues one count query with its own generation stamp. A result
//! is kept only if no newer count was issued since; a failure keeps the last
//! known total and is logged, never surfaced.

use tokio_util::sync::CancellationToken;
use tracklist_types::{QueryState, RecordFilter, SortSpec};

use crate::{error::Result, generation::GenerationGate, service::RecordService};

/// Effect of one count commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    /// The total was replaced.
    Updated(u64),
    /// The query failed; the previous total was kept.
    Retained,
    /// A newer count was issued first; nothing changed.
    Superseded,
}

/// Tracks the total of the newest count query.
#[derive(Debug)]
pub struct CountEstimator {
    gate: GenerationGate,
    total: Option<u64>,
}

impl CountEstimator {
    /// Creates an estimator whose queries are cancelled with `root`.
    pub fn new(root: CancellationToken) -> Self {
        Self { gate: GenerationGate::new(root), total: None }
    }

    /// Stamps a count query for the filter of `query`.
    pub fn begin(&mut self, query: &QueryState) -> CountTicket {
        let stamp = self.gate.advance();
        CountTicket {
            generation: stamp.generation,
            filter: query.filter(),
            sort: query.sort(),
            token: stamp.token,
        }
    }

    /// Applies a finished count query.
    ///
    /// `None` means the query was cancelled before it completed.
    pub fn commit(&mut self, generation: u64, result: Option<Result<u64>>) -> CountOutcome {
        if !self.gate.is_current(generation) {
            tracing::debug!(generation, current = self.gate.current(), "discarding stale count");
            return CountOutcome::Superseded;
        }
        self.gate.settle(generation);
        match result {
            None => CountOutcome::Superseded,
            Some(Ok(total)) => {
                self.total = Some(total);
                CountOutcome::Updated(total)
            },
            Some(Err(err)) => {
                tracing::warn!(generation, error = %err, "count query failed, keeping previous total");
                CountOutcome::Retained
            },
        }
    }

    /// Last successfully counted total.
    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

/// One issued count query.
#[derive(Debug, Clone)]
pub struct CountTicket {
    generation: u64,
    filter: RecordFilter,
    sort: SortSpec,
    token: CancellationToken,
}

impl CountTicket {
    /// Generation stamp.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs the query; `None` if the ticket was cancelled first.
    pub async fn run(&self, service: &dyn RecordService) -> Option<Result<u64>> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            result = service.query_count(&self.filter, &self.sort) => Some(result),
        }
    }
}
