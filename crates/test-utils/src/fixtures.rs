//! Record fixtures.
//!
//! Deterministic datasets for engine tests. Ids are `"1"`, `"2"`, ... and
//! names `"Record 1"`, `"Record 2"`, ..., so a search term such as
//! `"record 1"` matches a predictable subset.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracklist_types::{Record, RecordId, RecordStatus};

/// First start date handed out by [`Dataset`].
const EPOCH: Option<NaiveDate> = NaiveDate::from_ymd_opt(2024, 1, 1);

/// Builds a single record with zero cost and no dates.
#[must_use]
pub fn record(id: &str, name: &str, status: RecordStatus, votes: u64) -> Record {
    Record {
        id: RecordId::new(id),
        name: name.to_owned(),
        start_date: None,
        end_date: None,
        cost: Decimal::ZERO,
        status,
        votes,
    }
}

/// Returns `count` records with ids `1..=count`, cycling through every status.
#[must_use]
pub fn sample_records(count: usize) -> Vec<Record> {
    Dataset::builder().size(count).build().records()
}

/// Parameters of a generated dataset.
///
/// # Example
///
/// ```
/// use tracklist_test_utils::Dataset;
/// use tracklist_types::RecordStatus;
///
/// let records = Dataset::builder()
///     .size(4)
///     .name_prefix("Shipment")
///     .statuses(vec![RecordStatus::Delayed])
///     .build()
///     .records();
/// assert_eq!(records[3].name, "Shipment 4");
/// assert!(records.iter().all(|r| r.status == RecordStatus::Delayed));
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct Dataset {
    /// Number of records.
    #[builder(default = 10)]
    pub size: usize,
    /// Name prefix; the record number is appended.
    #[builder(default = "Record".to_owned(), into)]
    pub name_prefix: String,
    /// Statuses assigned round-robin.
    #[builder(default = RecordStatus::ALL.to_vec())]
    pub statuses: Vec<RecordStatus>,
    /// Starting vote count of every record.
    #[builder(default)]
    pub votes: u64,
    /// Id of the first record.
    #[builder(default = 1)]
    pub first_id: usize,
}

impl Dataset {
    /// Generates the records.
    ///
    /// Record `n` (zero-based) starts `7 * n` days after 2024-01-01, ends three
    /// days later and costs `n + 1` times 10.50.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        (0..self.size)
            .map(|n| {
                let number = self.first_id + n;
                let status = if self.statuses.is_empty() {
                    RecordStatus::Pending
                } else {
                    self.statuses[n % self.statuses.len()]
                };
                let start = EPOCH.and_then(|epoch| epoch.checked_add_days(Days::new(7 * n as u64)));
                Record {
                    id: RecordId::from(number as u64),
                    name: format!("{} {number}", self.name_prefix),
                    start_date: start,
                    end_date: start.and_then(|s| s.checked_add_days(Days::new(3))),
                    cost: Decimal::new(1050, 2) * Decimal::from(n as u64 + 1),
                    status,
                    votes: self.votes,
                }
            })
            .collect()
    }
}
