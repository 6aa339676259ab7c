//! Shared test utilities for tracklist crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary directory with path helpers
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`record`], [`sample_records`], [`Dataset`] - Deterministic record fixtures
//! - [`strategies`] - Proptest generators for records and page sequences

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::TestDir;

mod assertions;
pub use assertions::assert_eventually;

mod fixtures;
pub use fixtures::{Dataset, record, sample_records};

pub mod strategies;
pub use strategies::{arb_page_sequence, arb_record};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use tracklist_types::RecordStatus;

    use super::*;

    // ============================================
    // TestDir tests
    // ============================================

    #[test]
    fn test_dir_creates_temp_directory() {
        let dir = TestDir::new();
        assert!(dir.path().exists(), "temp directory should exist");
        assert!(dir.path().is_dir(), "should be a directory");
    }

    #[test]
    fn test_dir_write_creates_parents() {
        let dir = TestDir::new();
        let path = dir.write("ledger/votes.json", "{}");
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_dir_cleanup_on_drop() {
        let path = {
            let dir = TestDir::new();
            let p = dir.write("file.txt", "data");
            assert!(p.exists());
            dir.path().to_path_buf()
        };
        assert!(!path.exists(), "temp directory should be cleaned up on drop");
    }

    // ============================================
    // assert_eventually tests
    // ============================================

    #[tokio::test]
    async fn test_assert_eventually_immediate_success() {
        assert!(assert_eventually(Duration::from_millis(100), || true).await);
    }

    #[tokio::test]
    async fn test_assert_eventually_delayed_success() {
        let counter = AtomicUsize::new(0);
        let result = assert_eventually(Duration::from_millis(500), || {
            counter.fetch_add(1, Ordering::SeqCst) >= 3
        })
        .await;
        assert!(result, "condition should eventually become true");
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assert_eventually_timeout() {
        assert!(!assert_eventually(Duration::from_millis(50), || false).await);
    }

    // ============================================
    // Fixture tests
    // ============================================

    #[test]
    fn test_sample_records_are_numbered_and_cycle_statuses() {
        let records = sample_records(7);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(records[0].name, "Record 1");
        assert_eq!(records[0].status, RecordStatus::ALL[0]);
        assert_eq!(records[5].status, RecordStatus::ALL[0]);
        assert!(records.iter().all(|r| r.votes == 0 && r.start_date.is_some()));
    }

    #[test]
    fn test_dataset_offsets_ids() {
        let records = Dataset::builder().size(2).first_id(100).votes(3).build().records();
        assert_eq!(records[0].id.as_str(), "100");
        assert_eq!(records[1].id.as_str(), "101");
        assert!(records.iter().all(|r| r.votes == 3));
    }
}
