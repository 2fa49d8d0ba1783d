//! Lock withdrawal and the two-phase confirm/reject handshake.
//!
//! ```text
//! Locked --request_confirm_locked--> PendingMarriageConfirmation
//!        PendingMarriageConfirmation --confirm_success--> Married
//!        PendingMarriageConfirmation --decline_success--> Locked
//! Locked --request_reject_locked--> RejectPending
//!        RejectPending --confirm_reject--> Available
//!        RejectPending --cancel_reject--> Locked
//! any active phase --withdraw_lock--> Available
//! ```
//!
//! Phase 1 and phase 2 run as separate operations with an arbitrary delay in
//! between, so phase 2 re-reads both users and the lock and the commit pins
//! every version it read.

use chrono::Utc;
use serde::Serialize;

use crate::error::CoreError;

use super::context::{ensure_caller, settle, MatchContext};
use super::messages::MatchOperation;
use super::model::{Couple, Lock, LockId, UserAccount, UserId};
use super::notice::MatchNotice;
use super::outcome::MatchOutcome;
use super::status::UserStatus;
use super::store::{Changeset, CommitReceipt};
use super::transition;

/// The caller's relationship as seen from their own account.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipView {
    pub user_id: UserId,
    pub status: UserStatus,
    pub lock: Option<Lock>,
    pub counterpart: Option<CounterpartView>,
    pub couple: Option<Couple>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterpartView {
    pub id: UserId,
    pub name: String,
    pub status: UserStatus,
}

/// A user, the lock it references, and the other party.
struct Binding {
    actor: UserAccount,
    lock: Lock,
    counterpart: UserAccount,
}

#[derive(Clone)]
pub struct LockManager {
    ctx: MatchContext,
}

impl LockManager {
    pub fn new(ctx: MatchContext) -> Self {
        Self { ctx }
    }

    /// Walk away from an active lock. Both users return to `Available`.
    pub async fn withdraw_lock(
        &self,
        caller: UserId,
        user_id: UserId,
        lock_id: LockId,
    ) -> Result<MatchOutcome, CoreError> {
        ensure_caller(caller, user_id)?;
        let actor = self.ctx.load_user(user_id).await?;
        let lock = self.load_lock(lock_id).await?;
        transition::ensure_party(&lock, &actor)?;
        let counterpart_id = lock
            .counterpart_of(actor.id)
            .ok_or_else(|| CoreError::Internal(format!("Lock {lock_id} has no counterpart")))?;
        let counterpart = self.ctx.load_user(counterpart_id).await?;

        let result = self
            .commit(transition::plan_withdraw_lock(&actor, &counterpart, &lock, Utc::now()))
            .await;
        if result.is_ok() {
            tracing::info!(lock_id, user_id, counterpart_id, "Lock withdrawn");
            self.ctx.dispatch(MatchNotice::LockWithdrawn {
                lock_id,
                withdrawn_by: user_id,
                counterpart_id,
            });
        }
        settle(MatchOperation::WithdrawLock, &counterpart.name, result)
    }

    /// Phase 1: the notifier claims the lock ended in marriage.
    pub async fn request_confirm_locked(
        &self,
        caller: UserId,
        notifier_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, notifier_id).await?;
        let result = self
            .commit(transition::plan_request_confirm_locked(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
            ))
            .await;
        if result.is_ok() {
            tracing::info!(
                lock_id = binding.lock.id,
                notifier_id,
                counterpart_id = binding.counterpart.id,
                "Marriage confirmation requested"
            );
            self.ctx.dispatch(MatchNotice::MarriageConfirmationRequested {
                lock_id: binding.lock.id,
                notifier_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::RequestConfirmLocked, &binding.counterpart.name, result)
    }

    /// Phase 2: the counterpart confirms the marriage claim.
    pub async fn confirm_success(
        &self,
        caller: UserId,
        accepting_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, accepting_id).await?;
        let result = self
            .commit(transition::plan_confirm_success(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
                Utc::now(),
            ))
            .await
            .and_then(|receipt| {
                receipt
                    .couple
                    .ok_or_else(|| CoreError::Internal("Marriage commit returned no couple".into()))
            });
        if let Ok(couple) = &result {
            tracing::info!(
                lock_id = binding.lock.id,
                couple_id = couple.id,
                accepting_id,
                counterpart_id = binding.counterpart.id,
                "Marriage confirmed"
            );
            self.ctx.dispatch(MatchNotice::MarriageConfirmed {
                lock_id: binding.lock.id,
                couple_id: couple.id,
                confirmed_by: accepting_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::ConfirmSuccess, &binding.counterpart.name, result)
    }

    /// Phase 2 alternative: the counterpart refuses the marriage claim and
    /// the claimant goes back to `Locked`.
    pub async fn decline_success(
        &self,
        caller: UserId,
        user_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, user_id).await?;
        let result = self
            .commit(transition::plan_decline_success(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
            ))
            .await;
        if result.is_ok() {
            tracing::info!(
                lock_id = binding.lock.id,
                user_id,
                counterpart_id = binding.counterpart.id,
                "Marriage claim declined"
            );
            self.ctx.dispatch(MatchNotice::MarriageDeclined {
                lock_id: binding.lock.id,
                declined_by: user_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::DeclineSuccess, &binding.counterpart.name, result)
    }

    /// Phase 1 of the reject handshake.
    pub async fn request_reject_locked(
        &self,
        caller: UserId,
        rejector_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, rejector_id).await?;
        let result = self
            .commit(transition::plan_request_reject_locked(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
            ))
            .await;
        if result.is_ok() {
            tracing::info!(
                lock_id = binding.lock.id,
                rejector_id,
                counterpart_id = binding.counterpart.id,
                "Lock rejection requested"
            );
            self.ctx.dispatch(MatchNotice::RejectConfirmationRequested {
                lock_id: binding.lock.id,
                rejector_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::RequestRejectLocked, &binding.counterpart.name, result)
    }

    /// Phase 2 of the reject handshake: both users return to `Available`.
    pub async fn confirm_reject(
        &self,
        caller: UserId,
        user_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, user_id).await?;
        let result = self
            .commit(transition::plan_confirm_reject(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
                Utc::now(),
            ))
            .await;
        if result.is_ok() {
            tracing::info!(
                lock_id = binding.lock.id,
                user_id,
                counterpart_id = binding.counterpart.id,
                "Lock rejection confirmed"
            );
            self.ctx.dispatch(MatchNotice::RejectConfirmed {
                lock_id: binding.lock.id,
                confirmed_by: user_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::ConfirmReject, &binding.counterpart.name, result)
    }

    /// The rejector takes back its pending reject request.
    pub async fn cancel_reject(
        &self,
        caller: UserId,
        user_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let binding = self.load_binding(caller, user_id).await?;
        let result = self
            .commit(transition::plan_cancel_reject(
                &binding.actor,
                &binding.counterpart,
                &binding.lock,
            ))
            .await;
        if result.is_ok() {
            tracing::info!(lock_id = binding.lock.id, user_id, "Lock rejection cancelled");
            self.ctx.dispatch(MatchNotice::RejectCancelled {
                lock_id: binding.lock.id,
                cancelled_by: user_id,
                counterpart_id: binding.counterpart.id,
            });
        }
        settle(MatchOperation::CancelReject, &binding.counterpart.name, result)
    }

    /// The caller's current status, lock, counterpart, and marriage record.
    pub async fn relationship(
        &self,
        caller: UserId,
        user_id: UserId,
    ) -> Result<RelationshipView, CoreError> {
        ensure_caller(caller, user_id)?;
        let user = self.ctx.load_user(user_id).await?;

        let lock = match user.lock_id {
            Some(lock_id) => self.ctx.store.find_lock(lock_id).await?,
            None => None,
        };
        let counterpart = match lock.as_ref().and_then(|l| l.counterpart_of(user_id)) {
            Some(id) => self
                .ctx
                .store
                .find_user(id)
                .await?
                .map(|u| CounterpartView {
                    id: u.id,
                    name: u.name,
                    status: u.status,
                }),
            None => None,
        };
        let couple = self.ctx.store.find_couple_for_user(user_id).await?;

        Ok(RelationshipView {
            user_id,
            status: user.status,
            lock,
            counterpart,
            couple,
        })
    }

    async fn load_lock(&self, lock_id: LockId) -> Result<Lock, CoreError> {
        self.ctx.store.find_lock(lock_id).await?.ok_or(CoreError::NotFound {
            entity: "Lock",
            id: lock_id,
        })
    }

    /// Resolve the acting user's lock and counterpart.
    ///
    /// A user that no longer references any lock surfaces as `NotFound`;
    /// that is what phase 2 sees after a concurrent withdrawal.
    async fn load_binding(&self, caller: UserId, user_id: UserId) -> Result<Binding, CoreError> {
        ensure_caller(caller, user_id)?;
        let actor = self.ctx.load_user(user_id).await?;
        let lock_id = actor.lock_id.ok_or(CoreError::NotFound {
            entity: "ActiveLock",
            id: user_id,
        })?;
        let lock = self.load_lock(lock_id).await?;
        transition::ensure_party(&lock, &actor)?;
        let counterpart_id = lock
            .counterpart_of(user_id)
            .ok_or_else(|| CoreError::Internal(format!("Lock {lock_id} has no counterpart")))?;
        let counterpart = self.ctx.load_user(counterpart_id).await?;
        Ok(Binding {
            actor,
            lock,
            counterpart,
        })
    }

    async fn commit(
        &self,
        plan: Result<Changeset, CoreError>,
    ) -> Result<CommitReceipt, CoreError> {
        let changes = plan?;
        Ok(self.ctx.store.commit(changes).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::matching::memory::InMemoryMatchStore;
    use crate::matching::notice::NoopNotifier;
    use crate::matching::outcome::FailureReason;
    use crate::matching::request_manager::RequestManager;
    use crate::matching::status::LockEnd;
    use crate::matching::store::MatchStore;
    use crate::matching::subscription::AllowAllSubscriptions;
    use crate::matching::test_support::BrokenCommits;

    struct Fixture {
        store: Arc<InMemoryMatchStore>,
        locks: LockManager,
        a: UserAccount,
        b: UserAccount,
        lock_id: LockId,
    }

    /// Two users, A and B, locked through A's accepted request.
    async fn locked_pair() -> Fixture {
        let store = Arc::new(InMemoryMatchStore::new());
        let a = store.insert_subscribed_user("Asha").await;
        let b = store.insert_subscribed_user("Bilal").await;
        let ctx = MatchContext::new(
            store.clone(),
            Arc::new(AllowAllSubscriptions),
            Arc::new(NoopNotifier),
        );
        let requests = RequestManager::new(ctx.clone());
        requests.create_request(a.id, a.id, b.id).await.unwrap();
        assert!(requests.accept_request(b.id, b.id, a.id).await.unwrap().success);

        let lock_id = store.find_user(a.id).await.unwrap().unwrap().lock_id.unwrap();
        Fixture {
            store,
            locks: LockManager::new(ctx),
            a,
            b,
            lock_id,
        }
    }

    async fn status_of(store: &InMemoryMatchStore, id: UserId) -> (UserStatus, Option<LockId>) {
        let user = store.find_user(id).await.unwrap().unwrap();
        (user.status, user.lock_id)
    }

    #[tokio::test]
    async fn full_happy_path_ends_in_marriage() {
        let f = locked_pair().await;

        let phase1 = f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap();
        assert!(phase1.success);
        assert_eq!(phase1.message, "Bilal has been asked to confirm your marriage.");
        assert_eq!(
            status_of(&f.store, f.a.id).await,
            (UserStatus::PendingMarriageConfirmation, Some(f.lock_id))
        );
        assert_eq!(status_of(&f.store, f.b.id).await, (UserStatus::Locked, Some(f.lock_id)));

        let phase2 = f.locks.confirm_success(f.b.id, f.b.id).await.unwrap();
        assert!(phase2.success);
        assert_eq!(phase2.message, "Congratulations! You and Asha are now married.");

        assert_eq!(status_of(&f.store, f.a.id).await, (UserStatus::Married, None));
        assert_eq!(status_of(&f.store, f.b.id).await, (UserStatus::Married, None));

        let couple = f.store.find_couple_for_user(f.a.id).await.unwrap().unwrap();
        assert_eq!(couple.lock_id, f.lock_id);
        assert!(couple.married_date <= Utc::now());

        let lock = f.store.find_lock(f.lock_id).await.unwrap().unwrap();
        assert!(!lock.is_active);
        assert_eq!(lock.end_reason, Some(LockEnd::Married));

        let withdraw = f.locks.withdraw_lock(f.a.id, f.a.id, f.lock_id).await.unwrap();
        assert!(withdraw.is_conflict());
    }

    #[tokio::test]
    async fn confirm_success_without_claim_conflicts() {
        let f = locked_pair().await;
        let outcome = f.locks.confirm_success(f.b.id, f.b.id).await.unwrap();
        assert!(outcome.is_conflict());
        assert_eq!(f.store.couple_count().await, 0);
    }

    #[tokio::test]
    async fn claimant_cannot_confirm_its_own_claim() {
        let f = locked_pair().await;
        f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap();
        let outcome = f.locks.confirm_success(f.a.id, f.a.id).await.unwrap();
        assert!(outcome.is_conflict());
    }

    #[tokio::test]
    async fn both_claiming_at_once_lets_only_the_first_through() {
        let f = locked_pair().await;
        assert!(f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap().success);
        let second = f.locks.request_confirm_locked(f.b.id, f.b.id).await.unwrap();
        assert!(second.is_conflict());
    }

    #[tokio::test]
    async fn decline_success_returns_claimant_to_locked() {
        let f = locked_pair().await;
        f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap();

        let outcome = f.locks.decline_success(f.b.id, f.b.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(status_of(&f.store, f.a.id).await, (UserStatus::Locked, Some(f.lock_id)));
        assert_eq!(status_of(&f.store, f.b.id).await, (UserStatus::Locked, Some(f.lock_id)));
    }

    #[tokio::test]
    async fn withdraw_lock_releases_both_sides() {
        let f = locked_pair().await;
        let outcome = f.locks.withdraw_lock(f.b.id, f.b.id, f.lock_id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "You have withdrawn from your lock with Asha.");

        assert_eq!(status_of(&f.store, f.a.id).await, (UserStatus::Available, None));
        assert_eq!(status_of(&f.store, f.b.id).await, (UserStatus::Available, None));
        let lock = f.store.find_lock(f.lock_id).await.unwrap().unwrap();
        assert_eq!(lock.end_reason, Some(LockEnd::Withdrawn));
        assert_eq!(lock.ended_by, Some(f.b.id));
    }

    #[tokio::test]
    async fn withdraw_lock_by_outsider_is_forbidden() {
        let f = locked_pair().await;
        let outsider = f.store.insert_user("Chen", None).await;
        let result = f.locks.withdraw_lock(outsider.id, outsider.id, f.lock_id).await;
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn withdraw_unknown_lock_is_not_found() {
        let f = locked_pair().await;
        let result = f.locks.withdraw_lock(f.a.id, f.a.id, 9_999).await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "Lock", .. }));
    }

    #[tokio::test]
    async fn confirm_after_withdrawal_is_not_found() {
        let f = locked_pair().await;
        f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap();
        f.locks.withdraw_lock(f.a.id, f.a.id, f.lock_id).await.unwrap();

        let result = f.locks.confirm_success(f.b.id, f.b.id).await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "ActiveLock", .. }));
        assert_eq!(f.store.couple_count().await, 0);
    }

    #[tokio::test]
    async fn racing_withdraw_and_confirm_resolve_exactly_once() {
        for _ in 0..20 {
            let f = locked_pair().await;
            f.locks.request_confirm_locked(f.a.id, f.a.id).await.unwrap();

            let (withdrawer, confirmer) = (f.locks.clone(), f.locks.clone());
            let (a_id, b_id, lock_id) = (f.a.id, f.b.id, f.lock_id);
            let withdraw =
                tokio::spawn(async move { withdrawer.withdraw_lock(a_id, a_id, lock_id).await });
            let confirm = tokio::spawn(async move { confirmer.confirm_success(b_id, b_id).await });

            let withdraw_ok = matches!(withdraw.await.unwrap(), Ok(o) if o.success);
            let confirm_ok = matches!(confirm.await.unwrap(), Ok(o) if o.success);
            assert!(withdraw_ok ^ confirm_ok, "exactly one side must win");

            let couples = f.store.couple_count().await;
            assert_eq!(couples, usize::from(confirm_ok));
            assert_eq!(f.store.active_lock_count().await, 0);

            let expected = if confirm_ok {
                UserStatus::Married
            } else {
                UserStatus::Available
            };
            assert_eq!(status_of(&f.store, a_id).await, (expected, None));
            assert_eq!(status_of(&f.store, b_id).await, (expected, None));
        }
    }

    #[tokio::test]
    async fn reject_handshake_returns_both_to_available() {
        let f = locked_pair().await;

        let phase1 = f.locks.request_reject_locked(f.a.id, f.a.id).await.unwrap();
        assert!(phase1.success);
        assert_eq!(status_of(&f.store, f.a.id).await, (UserStatus::Locked, Some(f.lock_id)));
        let lock = f.store.find_lock(f.lock_id).await.unwrap().unwrap();
        assert_eq!(lock.reject_requested_by, Some(f.a.id));

        let phase2 = f.locks.confirm_reject(f.b.id, f.b.id).await.unwrap();
        assert!(phase2.success);
        assert_eq!(status_of(&f.store, f.a.id).await, (UserStatus::Available, None));
        assert_eq!(status_of(&f.store, f.b.id).await, (UserStatus::Available, None));
        let lock = f.store.find_lock(f.lock_id).await.unwrap().unwrap();
        assert_eq!(lock.end_reason, Some(LockEnd::Rejected));
    }

    #[tokio::test]
    async fn confirm_reject_without_request_conflicts() {
        let f = locked_pair().await;
        let outcome = f.locks.confirm_reject(f.b.id, f.b.id).await.unwrap();
        assert_eq!(outcome.reason, Some(FailureReason::Conflict));
        assert_eq!(
            outcome.message,
            "Your request to end your lock with Asha could not be saved."
        );
    }

    #[tokio::test]
    async fn pending_reject_blocks_marriage_claims_until_cancelled() {
        let f = locked_pair().await;
        f.locks.request_reject_locked(f.a.id, f.a.id).await.unwrap();
        assert!(f.locks.request_confirm_locked(f.b.id, f.b.id).await.unwrap().is_conflict());

        assert!(f.locks.cancel_reject(f.a.id, f.a.id).await.unwrap().success);
        assert!(f.locks.request_confirm_locked(f.b.id, f.b.id).await.unwrap().success);
    }

    #[tokio::test]
    async fn handshake_on_behalf_of_other_user_is_forbidden() {
        let f = locked_pair().await;
        let result = f.locks.request_confirm_locked(f.b.id, f.a.id).await;
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn available_user_has_no_active_lock() {
        let f = locked_pair().await;
        let single = f.store.insert_user("Chen", None).await;
        let result = f.locks.request_reject_locked(single.id, single.id).await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "ActiveLock", .. }));
    }

    #[tokio::test]
    async fn failed_commit_leaves_the_lock_intact() {
        let f = locked_pair().await;
        let ctx = MatchContext::new(
            Arc::new(BrokenCommits(f.store.clone())),
            Arc::new(AllowAllSubscriptions),
            Arc::new(NoopNotifier),
        );

        let outcome = LockManager::new(ctx)
            .withdraw_lock(f.a.id, f.a.id, f.lock_id)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.reason, Some(FailureReason::PersistenceFailure));
        assert_eq!(outcome.message, "Your lock with Bilal could not be withdrawn.");
        assert_eq!(f.store.active_lock_count().await, 1);
        for id in [f.a.id, f.b.id] {
            assert_eq!(status_of(&f.store, id).await, (UserStatus::Locked, Some(f.lock_id)));
        }
    }

    #[tokio::test]
    async fn relationship_view_resolves_counterpart_through_the_lock() {
        let f = locked_pair().await;
        let view = f.locks.relationship(f.a.id, f.a.id).await.unwrap();
        assert_eq!(view.status, UserStatus::Locked);
        assert_eq!(view.lock.as_ref().map(|l| l.id), Some(f.lock_id));
        let counterpart = view.counterpart.unwrap();
        assert_eq!(counterpart.id, f.b.id);
        assert_eq!(counterpart.name, "Bilal");
        assert!(view.couple.is_none());
    }
}
