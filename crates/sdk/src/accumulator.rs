//! Growing, deduplicated record list.
//!
//! Pages are merged in commit order. A reset replaces the list; an append
//! keeps only ids not already present and adds them after the existing
//! records. The next page offset is always the number of records held.
//!
//! # `has_more`
//!
//! With a known total, more records exist while the list is shorter than the
//! total. Without one, a full page is taken to mean more may follow. That
//! heuristic is approximate: a collection whose size is an exact multiple of
//! the page size costs one extra, empty request, and an endpoint that returns
//! short pages mid-collection ends the list early.

use std::collections::{HashMap, HashSet};

use tracklist_types::{Page, Record, RecordId};

/// Effect of one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Records added by this commit.
    pub added: usize,
    /// Records held after the commit.
    pub len: usize,
    /// Whether more records may exist.
    pub has_more: bool,
}

/// Ordered record list with at most one entry per id.
#[derive(Debug, Clone)]
pub struct ListAccumulator {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
    has_more: bool,
    total: Option<u64>,
    /// Bumped by every reset; records read in one epoch are gone in the next.
    epoch: u64,
}

impl Default for ListAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ListAccumulator {
    /// Creates an empty list that expects records.
    pub fn new() -> Self {
        Self { records: Vec::new(), index: HashMap::new(), has_more: true, total: None, epoch: 0 }
    }

    /// Discards all records ahead of a new query.
    pub fn reset(&mut self) {
        self.records.clear();
        self.index.clear();
        self.has_more = true;
        self.total = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Merges a fetched page.
    ///
    /// `limit` is the page size the page was requested with.
    pub fn commit(&mut self, page: Page, is_reset: bool, limit: usize) -> CommitSummary {
        let Page { items, total } = page;
        let returned = items.len();

        if is_reset {
            self.reset();
        }
        if total.is_some() {
            self.total = total;
        }

        let mut seen: HashSet<RecordId> = HashSet::with_capacity(returned);
        let mut added = 0;
        for record in items {
            if self.index.contains_key(&record.id) || !seen.insert(record.id.clone()) {
                continue;
            }
            self.index.insert(record.id.clone(), self.records.len());
            self.records.push(record);
            added += 1;
        }

        let len = self.records.len();
        self.has_more = match (is_reset, self.total) {
            (true, Some(total)) => (len as u64) < total,
            (true, None) => returned == limit,
            (false, total) => {
                added > 0 && returned == limit && total.is_none_or(|total| (len as u64) < total)
            },
        };

        CommitSummary { added, len, has_more: self.has_more }
    }

    /// Overwrites the vote count of a held record, returning the previous count.
    pub fn set_votes(&mut self, id: &RecordId, votes: u64) -> Option<u64> {
        let position = *self.index.get(id)?;
        let record = self.records.get_mut(position)?;
        Some(std::mem::replace(&mut record.votes, votes))
    }

    /// Looks up a held record.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).and_then(|&position| self.records.get(position))
    }

    /// Records in list order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offset of the next "load more" request.
    pub fn next_offset(&self) -> usize {
        self.records.len()
    }

    /// Whether more records may exist.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Exact match count, once an endpoint reported it.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of resets so far. Appends leave it unchanged.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
