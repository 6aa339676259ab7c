//! List session façade.
//!
//! A [`ListSession`] owns one dashboard list: its query, the accumulated
//! records, the load state and the last error. It drives the fetch and count
//! coordinators on every query change, pages on demand, debounces search
//! edits and routes vote toggles through the mutation coordinator.
//!
//! All per-list state lives inside the session, so any number of sessions can
//! run side by side. Clones share the same list.

use std::{sync::Arc, time::Instant};

use parking_lot::Mutex;
use snafu::ensure;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracklist_types::{QueryState, Record, RecordId, RecordStatus, SortSpec, UserId};

use crate::{
    accumulator::ListAccumulator,
    config::EngineConfig,
    count::{CountEstimator, CountOutcome, CountTicket},
    debounce::Debouncer,
    error::{FetchPhase, Result, SdkError, ShutdownSnafu},
    fetch::{FetchCoordinator, FetchOutcome, FetchTicket},
    idempotency::VoteLedger,
    metrics::{EngineMetrics, default_metrics},
    mutation::{MutationCoordinator, VoteOutcome, VoteSlot, VoteTarget},
    service::RecordService,
    state::{LoadEvent, LoadState},
    summary::RecordSummary,
};

/// Point-in-time view of a session, as consumed by a list renderer.
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    /// Query the records belong to.
    pub query: QueryState,
    /// Accumulated records in display order.
    pub items: Vec<Record>,
    /// Whether "load more" may return further records.
    pub has_more: bool,
    /// Whether a fetch for the current query is in flight.
    pub is_loading: bool,
    /// Load lifecycle state.
    pub load_state: LoadState,
    /// Exact match count: from the last page if it carried one, otherwise from the count query.
    pub total: Option<u64>,
    /// Last fetch failure, cleared by the next fetch.
    pub error: Option<SdkError>,
    /// Generation of the newest list fetch.
    pub generation: u64,
}

/// Handle to one incrementally loaded record list.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tracklist_sdk::{EngineConfig, ListSession, mock::MockRecordService};
/// use tracklist_types::RecordStatus;
///
/// # async fn example() -> tracklist_sdk::Result<()> {
/// let service = Arc::new(MockRecordService::default());
/// let session = ListSession::builder(service)
///     .config(EngineConfig::builder().page_size(25).build()?)
///     .build()?;
///
/// session.refresh().await?;
/// session.set_status(Some(RecordStatus::Delayed)).await?;
/// while session.snapshot().has_more {
///     session.load_more().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ListSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    service: Arc<dyn RecordService>,
    config: EngineConfig,
    state: Mutex<SessionState>,
    mutations: MutationCoordinator,
    debouncer: Debouncer,
    metrics: Arc<dyn EngineMetrics>,
    shutdown: CancellationToken,
}

#[derive(Debug)]
struct SessionState {
    query: QueryState,
    fetch: FetchCoordinator,
    count: CountEstimator,
    list: ListAccumulator,
    load: LoadState,
    error: Option<SdkError>,
    /// Set until a reset commits; "load more" turns into a reset meanwhile.
    needs_reset: bool,
}

#[bon::bon]
impl ListSession {
    /// Creates a session over `service`.
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) or a query setter is called.
    /// Without an explicit `query`, the default query with the configured page size is used.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if `config` fails validation.
    #[builder]
    pub fn new(
        #[builder(start_fn)] service: Arc<dyn RecordService>,
        #[builder(default)] config: EngineConfig,
        #[builder(default = VoteLedger::in_memory())] ledger: VoteLedger,
        #[builder(default = default_metrics())] metrics: Arc<dyn EngineMetrics>,
        query: Option<QueryState>,
    ) -> Result<Self> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let query = query.unwrap_or_else(|| QueryState::with_page_size_of(config.page_size));
        let state = SessionState {
            query,
            fetch: FetchCoordinator::new(shutdown.clone()),
            count: CountEstimator::new(shutdown.clone()),
            list: ListAccumulator::new(),
            load: LoadState::Idle,
            error: None,
            needs_reset: true,
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                service,
                debouncer: Debouncer::new(config.search_debounce),
                config,
                state: Mutex::new(state),
                mutations: MutationCoordinator::new(ledger),
                metrics,
                shutdown,
            }),
        })
    }
}

impl ListSession {
    /// Returns the current query.
    pub fn query(&self) -> QueryState {
        self.inner.state.lock().query.clone()
    }

    /// Replaces the whole query. Resets the list unless the query is unchanged.
    pub async fn set_query(&self, query: QueryState) -> Result<FetchOutcome> {
        self.reset_with(|_| query, false).await
    }

    /// Sets the search term immediately.
    pub async fn set_search(&self, search: impl Into<String>) -> Result<FetchOutcome> {
        let search = search.into();
        self.reset_with(|query| query.with_search(search), false).await
    }

    /// Sets the search term after the configured quiet period.
    ///
    /// A later call within the quiet period cancels this one. The returned task
    /// resolves to `true` if the edit was applied.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn set_search_debounced(&self, search: impl Into<String>) -> Result<JoinHandle<bool>> {
        self.ensure_running()?;
        let session = self.clone();
        let search = search.into();
        Ok(self.inner.debouncer.schedule(async move {
            if let Err(err) = session.set_search(search).await {
                tracing::debug!(error = %err, "debounced search reset failed");
            }
        }))
    }

    /// Sets the status filter; `None` shows every status.
    pub async fn set_status(&self, status: Option<RecordStatus>) -> Result<FetchOutcome> {
        self.reset_with(|query| query.with_status(status), false).await
    }

    /// Sets the sort key and direction.
    pub async fn set_sort(&self, sort: SortSpec) -> Result<FetchOutcome> {
        self.reset_with(|query| query.with_sort(sort), false).await
    }

    /// Sets the page size (minimum one).
    pub async fn set_page_size(&self, page_size: usize) -> Result<FetchOutcome> {
        self.reset_with(|query| query.with_page_size(page_size), false).await
    }

    /// Reloads the first page of the current query, discarding the list.
    ///
    /// This is the initial load and the retry path after a failed reset.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        self.reset_with(QueryState::clone, true).await
    }

    /// Fetches the next page at the current record count.
    ///
    /// Returns [`FetchOutcome::Busy`] while any fetch for the query is in
    /// flight and [`FetchOutcome::Exhausted`] once the list is complete. Before
    /// the first reset has committed, this performs the reset instead.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::FetchFailed`] if the page could not be fetched; the
    /// accumulated records and `has_more` are left as they were.
    pub async fn load_more(&self) -> Result<FetchOutcome> {
        self.ensure_running()?;
        let ticket = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.load.is_loading() {
                return Ok(FetchOutcome::Busy);
            }
            if state.needs_reset {
                None
            } else if !state.list.has_more() {
                return Ok(FetchOutcome::Exhausted);
            } else {
                state.load = state.load.apply(LoadEvent::LoadMoreStarted);
                state.error = None;
                let ticket =
                    state.fetch.begin(FetchPhase::Append, &state.query, state.list.next_offset());
                tracing::debug!(
                    generation = ticket.generation(),
                    offset = ticket.window().offset,
                    limit = ticket.window().limit,
                    "loading more"
                );
                Some(ticket)
            }
        };

        match ticket {
            Some(ticket) => self.run_list(ticket).await,
            None => self.refresh().await,
        }
    }

    /// Repeats whatever failed last: a page append, or otherwise a reset.
    pub async fn retry(&self) -> Result<FetchOutcome> {
        let failed_phase = match &self.inner.state.lock().error {
            Some(SdkError::FetchFailed { phase, .. }) => Some(*phase),
            _ => None,
        };
        match failed_phase {
            Some(FetchPhase::Append) => self.load_more().await,
            _ => self.refresh().await,
        }
    }

    /// Toggles `user`'s vote on a listed record.
    ///
    /// The new count is visible in [`snapshot`](Self::snapshot) before the
    /// patch completes. `None` for `user` is a no-op.
    ///
    /// # Errors
    ///
    /// - [`SdkError::MutationFailed`] if the patch failed and the count was rolled back
    /// - [`SdkError::Storage`] if the vote ledger failed
    /// - [`SdkError::Shutdown`] after [`shutdown`](Self::shutdown)
    pub async fn toggle_vote(&self, id: &RecordId, user: Option<&UserId>) -> Result<VoteOutcome> {
        self.ensure_running()?;
        let result = self
            .inner
            .mutations
            .toggle_vote(self.inner.as_ref(), self.inner.service.as_ref(), id, user)
            .await;
        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(SdkError::MutationFailed { .. }) => "rolled_back",
            Err(_) => "error",
        };
        self.inner.metrics.record_vote(label);
        result
    }

    /// Returns whether `user` has a recorded vote on `id`.
    pub fn has_voted(&self, user: &UserId, id: &RecordId) -> Result<bool> {
        self.inner.mutations.ledger().has_voted(user, id)
    }

    /// Returns true while a vote toggle on `id` is pending.
    pub fn is_vote_pending(&self, id: &RecordId) -> bool {
        self.inner.mutations.is_submitting(id)
    }

    /// Returns a listed record.
    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.inner.state.lock().list.get(id).cloned()
    }

    /// Reads a single record from the service, listed or not.
    pub async fn fetch_record(&self, id: &RecordId) -> Result<Option<Record>> {
        self.ensure_running()?;
        self.inner.service.get_record(id).await
    }

    /// Captures the state a renderer needs.
    pub fn snapshot(&self) -> ListSnapshot {
        let state = self.inner.state.lock();
        ListSnapshot {
            query: state.query.clone(),
            items: state.list.records().to_vec(),
            has_more: state.list.has_more(),
            is_loading: state.load.is_loading(),
            load_state: state.load,
            total: state.list.total().or(state.count.total()),
            error: state.error.clone(),
            generation: state.fetch.generation(),
        }
    }

    /// Aggregates the accumulated records.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary::from_records(self.inner.state.lock().list.records())
    }

    /// Cancels in-flight fetches and any pending search edit.
    ///
    /// Later calls fail with [`SdkError::Shutdown`]; snapshots stay readable.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.debouncer.cancel();
        tracing::info!("list session shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    fn ensure_running(&self) -> Result<()> {
        ensure!(!self.inner.shutdown.is_cancelled(), ShutdownSnafu);
        Ok(())
    }

    /// Applies a query edit and, if anything changed or `force` is set,
    /// reloads the first page together with the count.
    async fn reset_with(
        &self,
        update: impl FnOnce(&QueryState) -> QueryState,
        force: bool,
    ) -> Result<FetchOutcome> {
        self.ensure_running()?;
        let (list_ticket, count_ticket) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let next = update(&state.query);
            if !force && next == state.query {
                return Ok(FetchOutcome::Unchanged);
            }

            state.query = next;
            state.list.reset();
            state.error = None;
            state.needs_reset = true;
            state.load = state.load.apply(LoadEvent::ResetStarted);

            let list_ticket = state.fetch.begin(FetchPhase::Reset, &state.query, 0);
            let count_ticket = if self.inner.config.count_enabled {
                Some(state.count.begin(&state.query))
            } else {
                None
            };
            tracing::info!(
                generation = list_ticket.generation(),
                search = state.query.search(),
                status = ?state.query.status(),
                sort = %state.query.sort(),
                page_size = state.query.page_size(),
                "query reset"
            );
            (list_ticket, count_ticket)
        };

        let count = async {
            if let Some(ticket) = count_ticket {
                self.run_count(ticket).await;
            }
        };
        let (outcome, ()) = tokio::join!(self.run_list(list_ticket), count);
        outcome
    }

    async fn run_list(&self, ticket: FetchTicket) -> Result<FetchOutcome> {
        let started = Instant::now();
        let result = ticket.run(self.inner.service.as_ref()).await;
        let phase = ticket.phase();
        let generation = ticket.generation();

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        if !state.fetch.is_current(generation) {
            state.load = state.load.apply(LoadEvent::Superseded);
            self.inner.metrics.record_stale(phase);
            tracing::debug!(
                generation,
                current = state.fetch.generation(),
                %phase,
                "discarding superseded page"
            );
            return Ok(FetchOutcome::Superseded);
        }
        state.fetch.settle(generation);

        // Only shutdown cancels a ticket that is still current.
        let Some(result) = result else {
            state.load = state.load.apply(LoadEvent::Cancelled);
            return Err(SdkError::Shutdown);
        };

        match result {
            Ok(page) => {
                let summary =
                    state.list.commit(page, phase == FetchPhase::Reset, ticket.window().limit);
                if phase == FetchPhase::Reset {
                    state.needs_reset = false;
                }
                state.load = state.load.apply(LoadEvent::Committed);
                state.error = None;
                self.inner.metrics.record_fetch(phase, started.elapsed(), true);
                tracing::debug!(
                    generation,
                    %phase,
                    added = summary.added,
                    len = summary.len,
                    has_more = summary.has_more,
                    "page committed"
                );
                Ok(FetchOutcome::Committed { added: summary.added, has_more: summary.has_more })
            },
            Err(err) => {
                let err = err.into_fetch_failed(phase);
                state.load = state.load.apply(LoadEvent::Failed);
                state.error = Some(err.clone());
                self.inner.metrics.record_fetch(phase, started.elapsed(), false);
                tracing::warn!(generation, %phase, error = %err, "fetch failed");
                Err(err)
            },
        }
    }

    async fn run_count(&self, ticket: CountTicket) {
        let started = Instant::now();
        let result = ticket.run(self.inner.service.as_ref()).await;
        let outcome = self.inner.state.lock().count.commit(ticket.generation(), result);
        match outcome {
            CountOutcome::Updated(_) => {
                self.inner.metrics.record_fetch(FetchPhase::Count, started.elapsed(), true);
            },
            CountOutcome::Retained => {
                self.inner.metrics.record_fetch(FetchPhase::Count, started.elapsed(), false);
                self.inner.metrics.record_count_failure();
            },
            CountOutcome::Superseded => self.inner.metrics.record_stale(FetchPhase::Count),
        }
    }
}

impl VoteTarget for SessionInner {
    fn current_votes(&self, id: &RecordId) -> Option<VoteSlot> {
        let state = self.state.lock();
        let epoch = state.list.epoch();
        state.list.get(id).map(|record| VoteSlot { votes: record.votes, epoch })
    }

    fn apply_votes(&self, id: &RecordId, votes: u64, epoch: u64) -> bool {
        let mut state = self.state.lock();
        state.list.epoch() == epoch && state.list.set_votes(id, votes).is_some()
    }
}
