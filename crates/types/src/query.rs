//! Query vocabulary: filters, windows, pages and the immutable query snapshot.

use serde::{Deserialize, Serialize};

use crate::types::{Record, RecordStatus, SortField, SortOrder, SortSpec};

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Filter applied to the collection, independent of pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordFilter {
    /// Free-text search matched case-insensitively against name and id.
    pub search: Option<String>,
    /// Exact status match; `None` means every status.
    pub status: Option<RecordStatus>,
}

impl RecordFilter {
    /// Returns the lowercase search needle, if any.
    pub fn search_needle(&self) -> Option<String> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
    }

    /// Returns true if the record passes both the status and the search filter.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(status) = self.status
            && record.status != status
        {
            return false;
        }
        self.matches_search(record)
    }

    /// Returns true if the record passes the search filter.
    pub fn matches_search(&self, record: &Record) -> bool {
        match self.search_needle() {
            Some(needle) => record.matches_search(&needle),
            None => true,
        }
    }

    /// Drops every record that does not pass the search filter, preserving order.
    pub fn retain_search_matches(&self, records: &mut Vec<Record>) {
        if let Some(needle) = self.search_needle() {
            records.retain(|record| record.matches_search(&needle));
        }
    }
}

/// Offset/limit window into the filtered, sorted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Number of records to skip.
    pub offset: usize,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl Window {
    /// Creates a window.
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// A single fetch result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Records in collection order.
    pub items: Vec<Record>,
    /// Exact number of records matching the filter, when the endpoint reports it.
    pub total: Option<u64>,
}

impl Page {
    /// Creates a page.
    pub fn new(items: Vec<Record>, total: Option<u64>) -> Self {
        Self { items, total }
    }

    /// Number of records in the page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Immutable snapshot of the dashboard's query parameters.
///
/// Every edit produces a new value through one of the `with_*` methods;
/// a snapshot is never mutated in place, so an in-flight request can be
/// tied to the exact parameters it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryState {
    search: String,
    status: Option<RecordStatus>,
    sort: SortSpec,
    page_size: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            sort: SortSpec::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryState {
    /// Creates the default query with the given page size.
    ///
    /// A page size of zero is raised to one.
    pub fn with_page_size_of(page_size: usize) -> Self {
        Self::default().with_page_size(page_size)
    }

    /// Returns the search term.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Returns the status filter.
    pub fn status(&self) -> Option<RecordStatus> {
        self.status
    }

    /// Returns the sort specification.
    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    /// Returns the sort field.
    pub fn sort_field(&self) -> SortField {
        self.sort.field
    }

    /// Returns the sort direction.
    pub fn sort_order(&self) -> SortOrder {
        self.sort.order
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns a copy with a new search term, trimmed of surrounding whitespace.
    #[must_use]
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        let search: String = search.into();
        Self { search: search.trim().to_owned(), ..self.clone() }
    }

    /// Returns a copy with a new status filter.
    #[must_use]
    pub fn with_status(&self, status: Option<RecordStatus>) -> Self {
        Self { status, ..self.clone() }
    }

    /// Returns a copy with a new sort.
    #[must_use]
    pub fn with_sort(&self, sort: SortSpec) -> Self {
        Self { sort, ..self.clone() }
    }

    /// Returns a copy with a new page size (minimum one).
    #[must_use]
    pub fn with_page_size(&self, page_size: usize) -> Self {
        Self { page_size: page_size.max(1), ..self.clone() }
    }

    /// Returns the filter part of the query.
    pub fn filter(&self) -> RecordFilter {
        let search = Some(self.search.trim()).filter(|s| !s.is_empty()).map(str::to_owned);
        RecordFilter { search, status: self.status }
    }

    /// Returns the window of one page starting at `offset`.
    pub fn window(&self, offset: usize) -> Window {
        Window::new(offset, self.page_size)
    }
}
