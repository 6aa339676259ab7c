//! Aggregates over a set of records, as shown next to the list.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracklist_types::{Record, RecordStatus};

/// Per-status and per-month counts plus totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    /// Records per status; statuses without records are absent.
    pub by_status: BTreeMap<RecordStatus, usize>,
    /// Records per start month (`YYYY-MM`), in month order. Records without a start date are skipped.
    pub by_month: BTreeMap<String, usize>,
    /// Number of records.
    pub total_records: usize,
    /// Sum of all costs, rounded to cents.
    pub total_cost: Decimal,
}

impl RecordSummary {
    /// Builds the summary of `records`.
    pub fn from_records(records: &[Record]) -> Self {
        let mut summary = Self { total_records: records.len(), ..Self::default() };
        let mut cost = Decimal::ZERO;
        for record in records {
            *summary.by_status.entry(record.status).or_default() += 1;
            if let Some(start) = record.start_date {
                *summary.by_month.entry(start.format("%Y-%m").to_string()).or_default() += 1;
            }
            cost += record.cost;
        }
        summary.total_cost = cost.round_dp(2);
        summary
    }

    /// Count for one status.
    pub fn status_count(&self, status: RecordStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
