//! Proptest strategies for tracklist domain types.
//!
//! Reusable generators for property-based testing across crates. Strategies produce
//! well-formed records while exploring edge cases through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use tracklist_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(pages in strategies::arb_page_sequence(5, 10)) {
//!         // test invariant with randomly generated pages
//!     }
//! }
//! ```

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tracklist_types::{Record, RecordId, RecordStatus, SortField, SortOrder, SortSpec};

/// Size of the id pool [`arb_page_sequence`] draws from.
///
/// Small enough that consecutive pages overlap regularly.
const ID_POOL: u64 = 24;

/// Generates a status.
pub fn arb_status() -> impl Strategy<Value = RecordStatus> {
    prop::sample::select(RecordStatus::ALL.to_vec())
}

/// Generates a sort specification.
pub fn arb_sort() -> impl Strategy<Value = SortSpec> {
    (
        prop::sample::select(vec![
            SortField::Id,
            SortField::Name,
            SortField::StartDate,
            SortField::EndDate,
            SortField::Cost,
            SortField::Votes,
        ]),
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)],
    )
        .prop_map(|(field, order)| SortSpec::new(field, order))
}

/// Generates an optional date in 2023-2025.
pub fn arb_date() -> impl Strategy<Value = Option<NaiveDate>> {
    proptest::option::of((2023i32..=2025, 1u32..=12, 1u32..=28))
        .prop_map(|ymd| ymd.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)))
}

/// Generates a record whose id is drawn from `ids`.
pub fn arb_record_with_id(ids: impl Strategy<Value = u64>) -> impl Strategy<Value = Record> {
    (ids, "[A-Za-z][A-Za-z ]{0,15}", arb_date(), arb_date(), 0i64..1_000_000, arb_status(), 0u64..500)
        .prop_map(|(id, name, start_date, end_date, cents, status, votes)| Record {
            id: RecordId::from(id),
            name,
            start_date,
            end_date,
            cost: Decimal::new(cents, 2),
            status,
            votes,
        })
}

/// Generates an arbitrary record.
pub fn arb_record() -> impl Strategy<Value = Record> {
    arb_record_with_id(any::<u64>())
}

/// Generates up to `max_pages` pages of at most `page_size` records each.
///
/// Ids come from a small shared pool, so the same id regularly shows up in
/// several pages and occasionally twice in one page.
pub fn arb_page_sequence(
    max_pages: usize,
    page_size: usize,
) -> impl Strategy<Value = Vec<Vec<Record>>> {
    let page = proptest::collection::vec(arb_record_with_id(1..=ID_POOL), 0..=page_size);
    proptest::collection::vec(page, 1..=max_pages.max(1))
}
