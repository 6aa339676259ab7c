//! The collection capabilities the engine consumes.
//!
//! The engine never speaks HTTP itself. It is handed an implementation of
//! [`RecordService`]: [`HttpRecordService`](crate::HttpRecordService) for a
//! real collection endpoint, or [`MockRecordService`](crate::mock::MockRecordService)
//! in tests.

use std::fmt;

use async_trait::async_trait;
use tracklist_types::{Page, Record, RecordFilter, RecordId, SortSpec, Window};

use crate::error::Result;

/// Remote record collection.
#[async_trait]
pub trait RecordService: Send + Sync + fmt::Debug {
    /// Returns one window of the filtered, sorted collection.
    ///
    /// `Page::total` carries the exact match count when the endpoint reports one.
    async fn query_collection(
        &self,
        filter: &RecordFilter,
        sort: &SortSpec,
        window: Window,
    ) -> Result<Page>;

    /// Returns the number of records matching `filter`, ignoring pagination.
    async fn query_count(&self, filter: &RecordFilter, sort: &SortSpec) -> Result<u64>;

    /// Stores a new vote count for a record.
    ///
    /// Returns the updated record when the endpoint echoes it.
    async fn patch_record_votes(&self, id: &RecordId, votes: u64) -> Result<Option<Record>>;

    /// Fetches a single record; `None` if it does not exist.
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Whether `query_collection` already applies the search filter exactly.
    ///
    /// When false, the engine filters every returned page by name/id substring itself.
    fn supports_remote_search(&self) -> bool {
        false
    }
}
