//! In-process record collection for engine testing.
//!
//! This module provides a controllable implementation of [`RecordService`]
//! for testing list sessions without a real collection endpoint.
//!
//! # Features
//!
//! - **Dataset**: Filter, sort and window semantics matching the HTTP service
//! - **Total reporting**: Switch exact totals off to exercise the page-size heuristic
//! - **Failure injection**: Fail the next N list, count or patch requests
//! - **Delay queues**: Per-call delays to stage out-of-order completions
//! - **Backend edits**: Insert records mid-session to stage overlapping windows
//! - **Request counting**: Track number of requests for verification
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tracklist_sdk::{ListSession, mock::MockRecordService};
//! use tracklist_test_utils::sample_records;
//!
//! # async fn example() -> tracklist_sdk::Result<()> {
//! let service = MockRecordService::new(sample_records(12));
//! let session = ListSession::builder(Arc::new(service.clone())).build()?;
//! session.refresh().await?;
//! assert_eq!(service.list_calls(), 1);
//! # Ok(())
//! # }
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracklist_types::{Page, Record, RecordFilter, RecordId, SortSpec, Window};

use crate::{
    error::{Result, SdkError},
    service::RecordService,
};

/// Shared state for the mock collection.
#[derive(Debug, Default)]
struct MockState {
    /// Backend rows in insertion order.
    records: RwLock<Vec<Record>>,

    /// When set, pages carry no total.
    omit_total: AtomicBool,

    /// When set, `query_collection` ignores the search term.
    local_search_only: AtomicBool,

    /// Number of failures to inject per operation.
    fail_lists: AtomicUsize,
    fail_counts: AtomicUsize,
    fail_patches: AtomicUsize,

    /// Delays consumed one per call, in call order.
    list_delays: Mutex<VecDeque<Duration>>,
    count_delays: Mutex<VecDeque<Duration>>,
    patch_delays: Mutex<VecDeque<Duration>>,

    /// Requests received per operation.
    list_calls: AtomicUsize,
    count_calls: AtomicUsize,
    patch_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl MockState {
    async fn maybe_delay(queue: &Mutex<VecDeque<Duration>>) {
        let delay = queue.lock().pop_front();
        if let Some(delay) = delay
            && !delay.is_zero()
        {
            tokio::time::sleep(delay).await;
        }
    }

    /// Consumes one injected failure, if any are left.
    fn should_fail(counter: &AtomicUsize) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }

    fn injected(operation: &str) -> SdkError {
        SdkError::Http { status: 503, message: format!("injected {operation} failure") }
    }

    fn filtered(&self, filter: &RecordFilter, sort: &SortSpec, apply_search: bool) -> Vec<Record> {
        let records = self.records.read();
        let mut rows: Vec<Record> = records
            .iter()
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .filter(|r| !apply_search || filter.matches_search(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        rows
    }
}

/// Controllable in-process record collection.
///
/// Cheap to clone; clones share the same dataset and counters, so a test can
/// hand one clone to the session and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockRecordService {
    state: Arc<MockState>,
}

impl MockRecordService {
    /// Creates a collection holding `records`.
    pub fn new(records: Vec<Record>) -> Self {
        let service = Self::default();
        *service.state.records.write() = records;
        service
    }

    /// Sets whether the collection applies the search term itself.
    #[must_use]
    pub fn with_remote_search(self, enabled: bool) -> Self {
        self.state.local_search_only.store(!enabled, Ordering::SeqCst);
        self
    }

    /// Sets whether pages report an exact total.
    #[must_use]
    pub fn with_total(self, enabled: bool) -> Self {
        self.set_report_total(enabled);
        self
    }

    /// Switches total reporting at runtime.
    pub fn set_report_total(&self, enabled: bool) {
        self.state.omit_total.store(!enabled, Ordering::SeqCst);
    }

    /// Inserts a record at `index` (clamped to the end), shifting later rows.
    pub fn insert(&self, index: usize, record: Record) {
        let mut records = self.state.records.write();
        let index = index.min(records.len());
        records.insert(index, record);
    }

    /// Removes a record; returns it if it existed.
    pub fn remove(&self, id: &RecordId) -> Option<Record> {
        let mut records = self.state.records.write();
        let position = records.iter().position(|r| &r.id == id)?;
        Some(records.remove(position))
    }

    /// Returns the backend copy of a record.
    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.state.records.read().iter().find(|r| &r.id == id).cloned()
    }

    /// Returns all backend rows.
    pub fn records(&self) -> Vec<Record> {
        self.state.records.read().clone()
    }

    /// Fails the next `count` list requests with HTTP 503.
    pub fn fail_next_lists(&self, count: usize) {
        self.state.fail_lists.store(count, Ordering::SeqCst);
    }

    /// Fails the next `count` count requests with HTTP 503.
    pub fn fail_next_counts(&self, count: usize) {
        self.state.fail_counts.store(count, Ordering::SeqCst);
    }

    /// Fails the next `count` patch requests with HTTP 503.
    pub fn fail_next_patches(&self, count: usize) {
        self.state.fail_patches.store(count, Ordering::SeqCst);
    }

    /// Delays the next not-yet-delayed list request.
    ///
    /// Delays are consumed in call order, so pushing `[slow, fast]` makes the
    /// first request finish after the second.
    pub fn push_list_delay(&self, delay: Duration) {
        self.state.list_delays.lock().push_back(delay);
    }

    /// Delays the next not-yet-delayed count request.
    pub fn push_count_delay(&self, delay: Duration) {
        self.state.count_delays.lock().push_back(delay);
    }

    /// Delays the next not-yet-delayed patch request.
    pub fn push_patch_delay(&self, delay: Duration) {
        self.state.patch_delays.lock().push_back(delay);
    }

    /// Returns the number of list requests received.
    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of count requests received.
    pub fn count_calls(&self) -> usize {
        self.state.count_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of patch requests received.
    pub fn patch_calls(&self) -> usize {
        self.state.patch_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of single-record requests received.
    pub fn get_calls(&self) -> usize {
        self.state.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordService for MockRecordService {
    async fn query_collection(
        &self,
        filter: &RecordFilter,
        sort: &SortSpec,
        window: Window,
    ) -> Result<Page> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        MockState::maybe_delay(&self.state.list_delays).await;
        if MockState::should_fail(&self.state.fail_lists) {
            return Err(MockState::injected("list"));
        }

        let apply_search = !self.state.local_search_only.load(Ordering::SeqCst);
        let rows = self.state.filtered(filter, sort, apply_search);
        let total = (!self.state.omit_total.load(Ordering::SeqCst)).then_some(rows.len() as u64);
        let items = rows.into_iter().skip(window.offset).take(window.limit).collect();
        Ok(Page::new(items, total))
    }

    async fn query_count(&self, filter: &RecordFilter, sort: &SortSpec) -> Result<u64> {
        self.state.count_calls.fetch_add(1, Ordering::SeqCst);
        MockState::maybe_delay(&self.state.count_delays).await;
        if MockState::should_fail(&self.state.fail_counts) {
            return Err(MockState::injected("count"));
        }
        Ok(self.state.filtered(filter, sort, true).len() as u64)
    }

    async fn patch_record_votes(&self, id: &RecordId, votes: u64) -> Result<Option<Record>> {
        self.state.patch_calls.fetch_add(1, Ordering::SeqCst);
        MockState::maybe_delay(&self.state.patch_delays).await;
        if MockState::should_fail(&self.state.fail_patches) {
            return Err(MockState::injected("patch"));
        }

        let mut records = self.state.records.write();
        let record = records.iter_mut().find(|r| &r.id == id).ok_or_else(|| SdkError::Http {
            status: 404,
            message: format!("record {id} not found"),
        })?;
        record.votes = votes;
        Ok(Some(record.clone()))
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        self.state.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(id))
    }

    fn supports_remote_search(&self) -> bool {
        !self.state.local_search_only.load(Ordering::SeqCst)
    }
}
