//! Optimistic vote toggles.
//!
//! A toggle writes the new count into the in-memory record before the patch
//! is sent, then either confirms it (flipping the ledger entry) or restores
//! the previous count. At most one toggle per record is in flight; a second
//! toggle on the same record while the first is pending is a no-op.
//!
//! Writes are stamped with the list's reset epoch. Once a reset has replaced
//! the record, neither the rollback nor the echoed count touches it.

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use tracklist_types::{RecordId, UserId};

use crate::{
    error::{Result, SdkError},
    idempotency::VoteLedger,
    service::RecordService,
};

/// Vote count of a held record and the list epoch it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSlot {
    /// Vote count.
    pub votes: u64,
    /// Reset epoch of the list holding the record.
    pub epoch: u64,
}

/// Holder of the in-memory records a toggle writes to.
pub trait VoteTarget: Send + Sync {
    /// Current vote count of a held record; `None` if it is not held.
    fn current_votes(&self, id: &RecordId) -> Option<VoteSlot>;

    /// Overwrites the vote count of a held record, unless the list was reset
    /// since `epoch`. Returns false if nothing was written.
    fn apply_votes(&self, id: &RecordId, votes: u64, epoch: u64) -> bool;
}

/// Result of a toggle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The patch succeeded.
    Applied {
        /// Confirmed vote count.
        votes: u64,
        /// Whether the user now has a vote on the record.
        voted: bool,
    },
    /// A toggle on the same record is still pending.
    InFlight,
    /// No caller identity; nothing happened.
    Unauthenticated,
    /// The record is not in the list.
    NotFound,
}

impl VoteOutcome {
    /// Short label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::InFlight => "in_flight",
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound => "not_found",
        }
    }
}

/// Count change of one toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePlan {
    /// Count before the toggle.
    pub previous: u64,
    /// Count after the toggle.
    pub next: u64,
    /// Ledger state before the toggle.
    pub had_voted: bool,
}

impl VotePlan {
    /// Retracts an existing vote or adds a new one. The count never drops below zero.
    pub fn new(previous: u64, had_voted: bool) -> Self {
        let next = if had_voted { previous.saturating_sub(1) } else { previous.saturating_add(1) };
        Self { previous, next, had_voted }
    }
}

/// Serializes toggles per record and keeps the ledger in step with the backend.
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    submitting: Arc<Mutex<HashSet<RecordId>>>,
    ledger: VoteLedger,
}

impl MutationCoordinator {
    /// Creates a coordinator over `ledger`.
    pub fn new(ledger: VoteLedger) -> Self {
        Self { submitting: Arc::default(), ledger }
    }

    /// The vote ledger.
    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    /// Returns true while a toggle on `id` is pending.
    pub fn is_submitting(&self, id: &RecordId) -> bool {
        self.submitting.lock().contains(id)
    }

    /// Claims the submitting slot of `id`; `None` if already claimed.
    fn try_begin(&self, id: &RecordId) -> Option<SubmitGuard> {
        if !self.submitting.lock().insert(id.clone()) {
            return None;
        }
        Some(SubmitGuard { submitting: Arc::clone(&self.submitting), id: id.clone() })
    }

    /// Toggles `user`'s vote on `id`.
    ///
    /// # Errors
    ///
    /// - [`SdkError::MutationFailed`] if the patch failed; the optimistic count
    ///   was restored and the ledger is unchanged.
    /// - [`SdkError::Storage`] if the ledger could not be read, or could not be
    ///   updated after a successful patch.
    pub async fn toggle_vote(
        &self,
        target: &dyn VoteTarget,
        service: &dyn RecordService,
        id: &RecordId,
        user: Option<&UserId>,
    ) -> Result<VoteOutcome> {
        let Some(user) = user else {
            return Ok(VoteOutcome::Unauthenticated);
        };
        let Some(_guard) = self.try_begin(id) else {
            tracing::debug!(record = %id, "vote already in flight");
            return Ok(VoteOutcome::InFlight);
        };
        let Some(slot) = target.current_votes(id) else {
            return Ok(VoteOutcome::NotFound);
        };

        let plan = VotePlan::new(slot.votes, self.ledger.has_voted(user, id)?);
        target.apply_votes(id, plan.next, slot.epoch);

        match service.patch_record_votes(id, plan.next).await {
            Ok(echo) => {
                let voted = !plan.had_voted;
                self.ledger.set_voted(user, id, voted)?;

                let mut votes = plan.next;
                if let Some(record) = echo
                    && record.votes != plan.next
                    && target.apply_votes(id, record.votes, slot.epoch)
                {
                    votes = record.votes;
                }
                tracing::debug!(record = %id, votes, voted, "vote applied");
                Ok(VoteOutcome::Applied { votes, voted })
            },
            Err(err) => {
                // A reset since the optimistic write holds freshly fetched counts; keep them.
                if target.apply_votes(id, plan.previous, slot.epoch) {
                    tracing::warn!(record = %id, error = %err, "vote failed, rolled back");
                } else {
                    tracing::warn!(record = %id, error = %err, "vote failed after list reset, kept fetched count");
                }
                Err(SdkError::MutationFailed { record: id.clone(), message: err.to_string() })
            },
        }
    }
}

/// Releases a record's submitting slot when dropped.
#[derive(Debug)]
struct SubmitGuard {
    submitting: Arc<Mutex<HashSet<RecordId>>>,
    id: RecordId,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.submitting.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use tracklist_test_utils::sample_records;
    use tracklist_types::Page;

    use super::*;
    use crate::{accumulator::ListAccumulator, mock::MockRecordService};

    struct Target(Mutex<ListAccumulator>);

    impl Target {
        fn votes(&self, id: &RecordId) -> Option<u64> {
            self.current_votes(id).map(|slot| slot.votes)
        }
    }

    impl VoteTarget for Target {
        fn current_votes(&self, id: &RecordId) -> Option<VoteSlot> {
            let list = self.0.lock();
            list.get(id).map(|r| VoteSlot { votes: r.votes, epoch: list.epoch() })
        }

        fn apply_votes(&self, id: &RecordId, votes: u64, epoch: u64) -> bool {
            let mut list = self.0.lock();
            list.epoch() == epoch && list.set_votes(id, votes).is_some()
        }
    }

    fn setup(votes: u64) -> (Target, MockRecordService, RecordId) {
        let mut records = sample_records(3);
        records[0].votes = votes;
        let service = MockRecordService::new(records.clone());
        let mut list = ListAccumulator::new();
        list.commit(Page::new(records, None), true, 10);
        (Target(Mutex::new(list)), service, RecordId::new("1"))
    }

    #[test]
    fn test_plan_never_goes_negative() {
        assert_eq!(VotePlan::new(0, true).next, 0);
        assert_eq!(VotePlan::new(3, true).next, 2);
        assert_eq!(VotePlan::new(3, false).next, 4);
    }

    #[tokio::test]
    async fn test_toggle_twice_is_inverse() {
        let (target, service, id) = setup(3);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let user = UserId::new("u1");

        let first = coordinator.toggle_vote(&target, &service, &id, Some(&user)).await.unwrap();
        assert_eq!(first, VoteOutcome::Applied { votes: 4, voted: true });
        assert!(coordinator.ledger().has_voted(&user, &id).unwrap());

        let second = coordinator.toggle_vote(&target, &service, &id, Some(&user)).await.unwrap();
        assert_eq!(second, VoteOutcome::Applied { votes: 3, voted: false });
        assert!(!coordinator.ledger().has_voted(&user, &id).unwrap());
        assert_eq!(target.votes(&id), Some(3));
        assert_eq!(service.record(&id).unwrap().votes, 3);
    }

    #[tokio::test]
    async fn test_failed_patch_rolls_back() {
        let (target, service, id) = setup(3);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let user = UserId::new("u1");
        service.fail_next_patches(1);

        let err = coordinator.toggle_vote(&target, &service, &id, Some(&user)).await.unwrap_err();
        assert!(matches!(err, SdkError::MutationFailed { ref record, .. } if *record == id));
        assert_eq!(target.votes(&id), Some(3));
        assert!(!coordinator.ledger().has_voted(&user, &id).unwrap());
        assert!(!coordinator.is_submitting(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_patch_keeps_count_fetched_by_reset() {
        let (target, service, id) = setup(3);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let user = UserId::new("u1");
        service.push_patch_delay(Duration::from_millis(100));
        service.fail_next_patches(1);

        // Another user's vote lands on the server; a reset fetches it mid-patch.
        let reset = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mut records = sample_records(3);
            records[0].votes = 4;
            target.0.lock().commit(Page::new(records, None), true, 10);
        };
        let (result, ()) =
            tokio::join!(coordinator.toggle_vote(&target, &service, &id, Some(&user)), reset);

        assert!(matches!(result, Err(SdkError::MutationFailed { .. })));
        assert_eq!(target.votes(&id), Some(4));
        assert!(!coordinator.ledger().has_voted(&user, &id).unwrap());
    }

    #[tokio::test]
    async fn test_unauthenticated_is_noop() {
        let (target, service, id) = setup(3);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let outcome = coordinator.toggle_vote(&target, &service, &id, None).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Unauthenticated);
        assert_eq!(target.votes(&id), Some(3));
        assert_eq!(service.patch_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let (target, service, _) = setup(0);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let outcome = coordinator
            .toggle_vote(&target, &service, &RecordId::new("404"), Some(&UserId::new("u1")))
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::NotFound);
        assert_eq!(service.patch_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_toggle_while_pending_is_noop() {
        let (target, service, id) = setup(3);
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let _held = coordinator.try_begin(&id).unwrap();

        let outcome = coordinator
            .toggle_vote(&target, &service, &id, Some(&UserId::new("u1")))
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::InFlight);
        assert_eq!(target.votes(&id), Some(3));
    }

    #[test]
    fn test_guard_releases_slot_on_drop() {
        let coordinator = MutationCoordinator::new(VoteLedger::in_memory());
        let id = RecordId::new("1");
        {
            let _guard = coordinator.try_begin(&id).unwrap();
            assert!(coordinator.is_submitting(&id));
            assert!(coordinator.try_begin(&id).is_none());
        }
        assert!(!coordinator.is_submitting(&id));
    }
}
