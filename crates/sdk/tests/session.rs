//! List session scenarios against the in-process collection.
//!
//! Covers paging and exhaustion, stale-response discarding, overlap
//! deduplication, optimistic votes, debounced search and failure recovery.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use tracklist_sdk::{
    EngineConfig, FetchOutcome, FetchPhase, FileLedgerStorage, ListSession, LoadState, RecordId,
    RecordStatus, SdkError, SortField, SortOrder, SortSpec, UserId, VoteLedger, VoteOutcome,
    mock::MockRecordService,
};
use tracklist_test_utils::{Dataset, TestDir, assert_eventually, record, sample_records};

// ============================================================================
// Helpers
// ============================================================================

fn session_with_page_size(service: &MockRecordService, page_size: usize) -> ListSession {
    let config = EngineConfig::builder().page_size(page_size).build().unwrap();
    ListSession::builder(Arc::new(service.clone())).config(config).build().unwrap()
}

fn ids(session: &ListSession) -> Vec<String> {
    session.snapshot().items.iter().map(|r| r.id.to_string()).collect()
}

fn user() -> UserId {
    UserId::new("user-1")
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_pages_until_exhausted_with_exact_total() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);

    assert_eq!(
        session.refresh().await.unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
    assert_eq!(session.snapshot().total, Some(12));

    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 2, has_more: false }
    );
    assert_eq!(session.load_more().await.unwrap(), FetchOutcome::Exhausted);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.items.len(), 12);
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.load_state, LoadState::Idle);
    assert_eq!(service.list_calls(), 3);
}

#[tokio::test]
async fn test_pages_until_short_page_without_total() {
    let service = MockRecordService::new(sample_records(12)).with_total(false);
    let config = EngineConfig::builder().page_size(5).count_enabled(false).build().unwrap();
    let session = ListSession::builder(Arc::new(service.clone())).config(config).build().unwrap();

    session.refresh().await.unwrap();
    session.load_more().await.unwrap();
    assert!(session.snapshot().has_more);
    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 2, has_more: false }
    );
    assert_eq!(session.snapshot().total, None);
    assert_eq!(service.count_calls(), 0);
}

#[tokio::test]
async fn test_load_more_before_first_reset_performs_reset() {
    let service = MockRecordService::new(sample_records(8));
    let session = session_with_page_size(&service, 5);

    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
    assert_eq!(ids(&session), ["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_query_change_resets_list() {
    let service = MockRecordService::new(
        Dataset::builder()
            .size(9)
            .statuses(vec![RecordStatus::Delivered, RecordStatus::Delayed, RecordStatus::Pending])
            .build()
            .records(),
    );
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    session.load_more().await.unwrap();
    assert_eq!(session.snapshot().items.len(), 9);

    session.set_status(Some(RecordStatus::Delayed)).await.unwrap();
    assert_eq!(ids(&session), ["2", "5", "8"]);
    assert_eq!(session.snapshot().total, Some(3));

    session.set_sort(SortSpec::new(SortField::Id, SortOrder::Desc)).await.unwrap();
    assert_eq!(ids(&session), ["8", "5", "2"]);
}

#[tokio::test]
async fn test_search_matches_name_and_id_when_service_ignores_search() {
    let service = MockRecordService::new(sample_records(12)).with_remote_search(false);
    let session = session_with_page_size(&service, 20);

    session.set_search("record 1").await.unwrap();
    assert_eq!(ids(&session), ["1", "10", "11", "12"]);
    // The count query always filters exactly.
    assert_eq!(session.snapshot().total, Some(4));
}

// ============================================================================
// Races
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stale_search_response_is_discarded() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    service.push_list_delay(Duration::from_millis(500));

    let slow = tokio::spawn({
        let session = session.clone();
        async move { session.set_search("Record 1").await }
    });
    tokio::task::yield_now().await;

    let fast = session.set_search("Record 2").await.unwrap();
    assert_eq!(fast, FetchOutcome::Committed { added: 1, has_more: false });
    assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Superseded);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.query.search(), "Record 2");
    assert_eq!(ids(&session), ["2"]);
    assert_eq!(snapshot.total, Some(1));
    assert_eq!(snapshot.load_state, LoadState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_page_is_discarded_after_reset() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    service.push_list_delay(Duration::from_secs(2));
    let page = tokio::spawn({
        let session = session.clone();
        async move { session.load_more().await }
    });
    tokio::task::yield_now().await;

    session.set_status(Some(RecordStatus::ALL[0])).await.unwrap();
    assert_eq!(page.await.unwrap().unwrap(), FetchOutcome::Superseded);
    assert!(session.snapshot().items.iter().all(|r| r.status == RecordStatus::ALL[0]));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_load_more_is_busy() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    service.push_list_delay(Duration::from_secs(1));
    let first = tokio::spawn({
        let session = session.clone();
        async move { session.load_more().await }
    });
    tokio::task::yield_now().await;

    assert_eq!(session.snapshot().load_state, LoadState::LoadingMore);
    assert_eq!(session.load_more().await.unwrap(), FetchOutcome::Busy);
    assert_eq!(
        first.await.unwrap().unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
    assert_eq!(service.list_calls(), 2);
}

#[tokio::test]
async fn test_overlapping_window_is_deduplicated() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    // A new record sorts first, shifting "5" into the next window.
    service.insert(0, record("0", "Record 0", RecordStatus::Pending, 0));

    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 4, has_more: true }
    );
    assert_eq!(ids(&session), ["1", "2", "3", "4", "5", "6", "7", "8", "9"]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_append_keeps_records_and_retries() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    service.fail_next_lists(1);
    let err = session.load_more().await.unwrap_err();
    assert!(matches!(err, SdkError::FetchFailed { phase: FetchPhase::Append, .. }));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.items.len(), 5);
    assert!(snapshot.has_more);
    assert_eq!(snapshot.load_state, LoadState::Error);
    assert!(snapshot.error.is_some());

    assert_eq!(
        session.retry().await.unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
    let snapshot = session.snapshot();
    assert_eq!(snapshot.items.len(), 10);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_failed_reset_leaves_empty_list() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    service.fail_next_lists(1);
    let err = session.set_search("Record").await.unwrap_err();
    assert!(matches!(err, SdkError::FetchFailed { phase: FetchPhase::Reset, .. }));
    let snapshot = session.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.load_state, LoadState::Error);

    // "load more" after a failed reset reloads the first page.
    assert_eq!(
        session.load_more().await.unwrap(),
        FetchOutcome::Committed { added: 5, has_more: true }
    );
}

#[tokio::test]
async fn test_count_failure_is_swallowed() {
    let service = MockRecordService::new(sample_records(12)).with_total(false);
    let session = session_with_page_size(&service, 5);
    service.fail_next_counts(1);

    session.refresh().await.unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.items.len(), 5);
    assert_eq!(snapshot.total, None);
    assert!(snapshot.error.is_none());

    session.refresh().await.unwrap();
    assert_eq!(session.snapshot().total, Some(12));
}

// ============================================================================
// Votes
// ============================================================================

#[tokio::test]
async fn test_vote_then_retract() {
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 3)]);
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    let id = RecordId::new("1");

    assert_eq!(
        session.toggle_vote(&id, Some(&user())).await.unwrap(),
        VoteOutcome::Applied { votes: 4, voted: true }
    );
    assert_eq!(session.record(&id).unwrap().votes, 4);
    assert!(session.has_voted(&user(), &id).unwrap());

    assert_eq!(
        session.toggle_vote(&id, Some(&user())).await.unwrap(),
        VoteOutcome::Applied { votes: 3, voted: false }
    );
    assert_eq!(service.record(&id).unwrap().votes, 3);
    assert!(!session.has_voted(&user(), &id).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_failed_vote_rolls_back_optimistic_count() {
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 3)]);
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    let id = RecordId::new("1");

    service.push_patch_delay(Duration::from_millis(200));
    service.fail_next_patches(1);
    let vote = tokio::spawn({
        let session = session.clone();
        let id = id.clone();
        async move { session.toggle_vote(&id, Some(&user())).await }
    });
    tokio::task::yield_now().await;

    assert_eq!(session.record(&id).unwrap().votes, 4);
    assert!(session.is_vote_pending(&id));

    let err = vote.await.unwrap().unwrap_err();
    assert!(matches!(err, SdkError::MutationFailed { .. }));
    assert_eq!(session.record(&id).unwrap().votes, 3);
    assert!(!session.is_vote_pending(&id));
    assert!(!session.has_voted(&user(), &id).unwrap());
    assert_eq!(service.record(&id).unwrap().votes, 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_vote_keeps_count_from_later_refresh() {
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 3)]);
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    let id = RecordId::new("1");

    service.push_patch_delay(Duration::from_millis(200));
    service.fail_next_patches(1);
    let vote = tokio::spawn({
        let session = session.clone();
        let id = id.clone();
        async move { session.toggle_vote(&id, Some(&user())).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(session.record(&id).unwrap().votes, 4);

    // Someone else votes on the server, and the list is reloaded mid-patch.
    service.remove(&id);
    service.insert(0, record("1", "Peas", RecordStatus::Delivered, 4));
    session.refresh().await.unwrap();
    assert_eq!(session.record(&id).unwrap().votes, 4);

    let err = vote.await.unwrap().unwrap_err();
    assert!(matches!(err, SdkError::MutationFailed { .. }));
    assert_eq!(session.record(&id).unwrap().votes, 4);
    assert_eq!(service.record(&id).unwrap().votes, 4);
    assert!(!session.has_voted(&user(), &id).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_second_toggle_while_pending_is_ignored() {
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 0)]);
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    let id = RecordId::new("1");

    service.push_patch_delay(Duration::from_secs(1));
    let first = tokio::spawn({
        let session = session.clone();
        let id = id.clone();
        async move { session.toggle_vote(&id, Some(&user())).await }
    });
    tokio::task::yield_now().await;

    assert_eq!(session.toggle_vote(&id, Some(&user())).await.unwrap(), VoteOutcome::InFlight);
    assert_eq!(
        first.await.unwrap().unwrap(),
        VoteOutcome::Applied { votes: 1, voted: true }
    );
    assert_eq!(service.patch_calls(), 1);
}

#[tokio::test]
async fn test_vote_without_user_is_noop() {
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 2)]);
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();
    let id = RecordId::new("1");

    assert_eq!(session.toggle_vote(&id, None).await.unwrap(), VoteOutcome::Unauthenticated);
    assert_eq!(
        session.toggle_vote(&RecordId::new("9"), Some(&user())).await.unwrap(),
        VoteOutcome::NotFound
    );
    assert_eq!(session.record(&id).unwrap().votes, 2);
    assert_eq!(service.patch_calls(), 0);
}

#[tokio::test]
async fn test_file_ledger_survives_session() {
    let dir = TestDir::new();
    let path = dir.join("ledger/votes.json");
    let service =
        MockRecordService::new(vec![record("1", "Peas", RecordStatus::Delivered, 0)]);
    let id = RecordId::new("1");

    {
        let ledger = VoteLedger::new(Arc::new(FileLedgerStorage::open(&path).unwrap()));
        let session =
            ListSession::builder(Arc::new(service.clone())).ledger(ledger).build().unwrap();
        session.refresh().await.unwrap();
        session.toggle_vote(&id, Some(&user())).await.unwrap();
    }

    let ledger = VoteLedger::new(Arc::new(FileLedgerStorage::open(&path).unwrap()));
    let session = ListSession::builder(Arc::new(service.clone())).ledger(ledger).build().unwrap();
    assert!(session.has_voted(&user(), &id).unwrap());

    session.refresh().await.unwrap();
    assert_eq!(
        session.toggle_vote(&id, Some(&user())).await.unwrap(),
        VoteOutcome::Applied { votes: 0, voted: false }
    );
}

// ============================================================================
// Debounce, reads, shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_debounced_search_applies_last_edit() {
    let service = MockRecordService::new(sample_records(12));
    let config = EngineConfig::builder()
        .page_size(5)
        .search_debounce(Duration::from_millis(300))
        .build()
        .unwrap();
    let session = ListSession::builder(Arc::new(service.clone())).config(config).build().unwrap();

    let first = session.set_search_debounced("Record 1").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = session.set_search_debounced("Record 2").unwrap();

    assert!(!first.await.unwrap());
    assert!(second.await.unwrap());
    assert_eq!(session.query().search(), "Record 2");
    assert_eq!(ids(&session), ["2"]);
    assert_eq!(service.list_calls(), 1);
}

#[tokio::test]
async fn test_fetch_record_reads_unlisted_record() {
    let service = MockRecordService::new(sample_records(12));
    let session = session_with_page_size(&service, 5);
    session.refresh().await.unwrap();

    let id = RecordId::new("11");
    assert!(session.record(&id).is_none());
    assert_eq!(session.fetch_record(&id).await.unwrap().unwrap().name, "Record 11");
    assert!(session.fetch_record(&RecordId::new("99")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_summary_covers_accumulated_records() {
    let records = Dataset::builder().size(4).statuses(vec![RecordStatus::Delayed]).build().records();
    let service = MockRecordService::new(records);
    let session = session_with_page_size(&service, 10);
    session.refresh().await.unwrap();

    let summary = session.summary();
    assert_eq!(summary.total_records, 4);
    assert_eq!(summary.status_count(RecordStatus::Delayed), 4);
    assert_eq!(summary.total_cost.to_string(), "105.00");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let service = MockRecordService::new(sample_records(12));
    let a = session_with_page_size(&service, 5);
    let b = session_with_page_size(&service, 5);

    a.refresh().await.unwrap();
    b.set_search("Record 2").await.unwrap();
    assert_eq!(a.snapshot().items.len(), 5);
    assert_eq!(ids(&b), ["2"]);

    b.shutdown();
    assert!(a.load_more().await.is_ok());
    assert!(assert_eventually(Duration::from_millis(100), || a.snapshot().items.len() == 10).await);
}
