//! Pure transition planners.
//!
//! Each planner takes the records an operation read from the store, checks
//! that the transition is legal for that snapshot, and returns the
//! [`Changeset`] that performs it. Every record the decision depends on is
//! written (or guarded) with its expected version, so a store commit fails
//! as stale if anything moved between the read and the write.
//!
//! Planners only ever fail with [`CoreError::Conflict`] or
//! [`CoreError::Forbidden`].

use crate::error::CoreError;
use crate::types::Timestamp;

use super::model::{ConnectionRequest, Lock, UserAccount};
use super::status::{LockEnd, RequestStatus, UserStatus};
use super::store::{Changeset, LockBinding, LockWrite, NewCouple, RequestWrite, UserWrite};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub fn plan_create_request(
    from: &UserAccount,
    to: &UserAccount,
    open_request: Option<&ConnectionRequest>,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    if from.id == to.id {
        return Err(CoreError::Conflict(
            "A user cannot send a request to themselves".into(),
        ));
    }
    if let Some(existing) = open_request {
        return Err(CoreError::Conflict(format!(
            "Request {} from user {} to user {} is still pending",
            existing.id, from.id, to.id
        )));
    }
    for user in [from, to] {
        if user.status == UserStatus::Married {
            return Err(CoreError::Conflict(format!("User {} is already married", user.id)));
        }
    }

    Ok(Changeset::default().with_request(RequestWrite::Insert {
        from_id: from.id,
        to_id: to.id,
        asked_date: now,
    }))
}

/// Close an open request with a terminal status.
fn plan_close_request(
    open_request: Option<&ConnectionRequest>,
    status: RequestStatus,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    let request = open_request
        .ok_or_else(|| CoreError::Conflict("No pending request exists for this pair".into()))?;
    if request.status.is_terminal() {
        return Err(CoreError::Conflict(format!(
            "Request {} is already {}",
            request.id, request.status
        )));
    }

    Ok(Changeset::default().with_request(RequestWrite::Transition {
        request_id: request.id,
        status,
        at: now,
    }))
}

pub fn plan_withdraw_request(
    open_request: Option<&ConnectionRequest>,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    plan_close_request(open_request, RequestStatus::Withdrawn, now)
}

pub fn plan_decline_request(
    open_request: Option<&ConnectionRequest>,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    plan_close_request(open_request, RequestStatus::Declined, now)
}

/// Accept `from`'s request to `to` and lock the pair.
pub fn plan_accept_request(
    to: &UserAccount,
    from: &UserAccount,
    open_request: Option<&ConnectionRequest>,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    for user in [to, from] {
        if !user.is_available() {
            return Err(CoreError::Conflict(format!(
                "User {} is {} and cannot enter a new lock",
                user.id, user.status
            )));
        }
    }

    let changes = plan_close_request(open_request, RequestStatus::Accepted, now)?;
    Ok(changes
        .with_lock(LockWrite::Insert {
            one_id: to.id,
            another_id: from.id,
            created_at: now,
        })
        .with_user(UserWrite::set(to, UserStatus::Locked, LockBinding::Created))
        .with_user(UserWrite::set(from, UserStatus::Locked, LockBinding::Created)))
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

/// `actor` must be a party to `lock`.
pub fn ensure_party(lock: &Lock, actor: &UserAccount) -> Result<(), CoreError> {
    if !lock.involves(actor.id) {
        return Err(CoreError::Forbidden(format!(
            "User {} is not a party to lock {}",
            actor.id, lock.id
        )));
    }
    Ok(())
}

/// The lock must be active and both users must still reference it.
fn ensure_linked(
    lock: &Lock,
    actor: &UserAccount,
    counterpart: &UserAccount,
) -> Result<(), CoreError> {
    ensure_party(lock, actor)?;
    if !lock.is_active {
        return Err(CoreError::Conflict(format!("Lock {} is no longer active", lock.id)));
    }
    if lock.counterpart_of(actor.id) != Some(counterpart.id) {
        return Err(CoreError::Conflict(format!(
            "User {} is not the counterpart of user {} in lock {}",
            counterpart.id, actor.id, lock.id
        )));
    }
    for user in [actor, counterpart] {
        if !user.is_bound_to(lock.id) || !user.status.holds_lock() {
            return Err(CoreError::Conflict(format!(
                "User {} is no longer linked to lock {}",
                user.id, lock.id
            )));
        }
    }
    Ok(())
}

fn ensure_status(user: &UserAccount, expected: UserStatus) -> Result<(), CoreError> {
    if user.status != expected {
        return Err(CoreError::Conflict(format!(
            "User {} is {}, expected {}",
            user.id, user.status, expected
        )));
    }
    Ok(())
}

fn guard_lock(lock: &Lock) -> LockWrite {
    LockWrite::Update {
        expected_version: lock.version,
        lock: lock.clone(),
    }
}

fn end_lock(lock: &Lock, reason: LockEnd, ended_by: &UserAccount, now: Timestamp) -> LockWrite {
    LockWrite::Update {
        expected_version: lock.version,
        lock: Lock {
            is_active: false,
            reject_requested_by: None,
            ended_at: Some(now),
            end_reason: Some(reason),
            ended_by: Some(ended_by.id),
            ..lock.clone()
        },
    }
}

/// Walk away from an active lock in any phase.
///
/// The counterpart is released only if it still references the lock, so a
/// half-broken link can still be cleaned up by the remaining party.
pub fn plan_withdraw_lock(
    actor: &UserAccount,
    counterpart: &UserAccount,
    lock: &Lock,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    ensure_party(lock, actor)?;
    if !lock.is_active {
        return Err(CoreError::Conflict(format!("Lock {} is no longer active", lock.id)));
    }
    if !actor.is_bound_to(lock.id) {
        return Err(CoreError::Conflict(format!(
            "User {} is no longer linked to lock {}",
            actor.id, lock.id
        )));
    }

    let mut changes = Changeset::default()
        .with_lock(end_lock(lock, LockEnd::Withdrawn, actor, now))
        .with_user(UserWrite::set(actor, UserStatus::Available, LockBinding::Unbound));
    if counterpart.is_bound_to(lock.id) {
        changes = changes.with_user(UserWrite::set(
            counterpart,
            UserStatus::Available,
            LockBinding::Unbound,
        ));
    }
    Ok(changes)
}

/// Phase 1 of the marriage handshake.
pub fn plan_request_confirm_locked(
    notifier: &UserAccount,
    counterpart: &UserAccount,
    lock: &Lock,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, notifier, counterpart)?;
    ensure_status(notifier, UserStatus::Locked)?;
    ensure_status(counterpart, UserStatus::Locked)?;
    if let Some(rejector) = lock.reject_requested_by {
        return Err(CoreError::Conflict(format!(
            "User {rejector} has asked to end lock {}",
            lock.id
        )));
    }

    Ok(Changeset::default()
        .with_lock(guard_lock(lock))
        .with_user(UserWrite::set(
            notifier,
            UserStatus::PendingMarriageConfirmation,
            LockBinding::Existing(lock.id),
        ))
        .with_user(UserWrite::guard(counterpart)))
}

/// Phase 2 of the marriage handshake: `acceptor` confirms `claimant`'s claim.
pub fn plan_confirm_success(
    acceptor: &UserAccount,
    claimant: &UserAccount,
    lock: &Lock,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, acceptor, claimant)?;
    ensure_status(claimant, UserStatus::PendingMarriageConfirmation)?;
    ensure_status(acceptor, UserStatus::Locked)?;

    Ok(Changeset::default()
        .with_lock(end_lock(lock, LockEnd::Married, acceptor, now))
        .with_user(UserWrite::set(acceptor, UserStatus::Married, LockBinding::Unbound))
        .with_user(UserWrite::set(claimant, UserStatus::Married, LockBinding::Unbound))
        .with_couple(NewCouple {
            one_id: lock.one_id,
            another_id: lock.another_id,
            lock_id: lock.id,
            married_date: now,
        }))
}

/// `decliner` refuses `claimant`'s marriage claim; the pair stays locked.
pub fn plan_decline_success(
    decliner: &UserAccount,
    claimant: &UserAccount,
    lock: &Lock,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, decliner, claimant)?;
    ensure_status(claimant, UserStatus::PendingMarriageConfirmation)?;
    ensure_status(decliner, UserStatus::Locked)?;

    Ok(Changeset::default()
        .with_lock(guard_lock(lock))
        .with_user(UserWrite::set(
            claimant,
            UserStatus::Locked,
            LockBinding::Existing(lock.id),
        ))
        .with_user(UserWrite::guard(decliner)))
}

/// Phase 1 of the reject handshake. User statuses do not change; the intent
/// is recorded on the lock.
pub fn plan_request_reject_locked(
    rejector: &UserAccount,
    counterpart: &UserAccount,
    lock: &Lock,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, rejector, counterpart)?;
    ensure_status(rejector, UserStatus::Locked)?;
    ensure_status(counterpart, UserStatus::Locked)?;
    if let Some(existing) = lock.reject_requested_by {
        return Err(CoreError::Conflict(format!(
            "User {existing} has already asked to end lock {}",
            lock.id
        )));
    }

    Ok(Changeset::default()
        .with_lock(LockWrite::Update {
            expected_version: lock.version,
            lock: Lock {
                reject_requested_by: Some(rejector.id),
                ..lock.clone()
            },
        })
        .with_user(UserWrite::guard(rejector))
        .with_user(UserWrite::guard(counterpart)))
}

/// Phase 2 of the reject handshake: `confirmer` agrees to `rejector`'s request.
pub fn plan_confirm_reject(
    confirmer: &UserAccount,
    rejector: &UserAccount,
    lock: &Lock,
    now: Timestamp,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, confirmer, rejector)?;
    if lock.reject_requested_by != Some(rejector.id) {
        return Err(CoreError::Conflict(format!(
            "User {} has not asked to end lock {}",
            rejector.id, lock.id
        )));
    }

    Ok(Changeset::default()
        .with_lock(end_lock(lock, LockEnd::Rejected, confirmer, now))
        .with_user(UserWrite::set(confirmer, UserStatus::Available, LockBinding::Unbound))
        .with_user(UserWrite::set(rejector, UserStatus::Available, LockBinding::Unbound)))
}

/// The rejector takes back its own pending reject request.
pub fn plan_cancel_reject(
    rejector: &UserAccount,
    counterpart: &UserAccount,
    lock: &Lock,
) -> Result<Changeset, CoreError> {
    ensure_linked(lock, rejector, counterpart)?;
    if lock.reject_requested_by != Some(rejector.id) {
        return Err(CoreError::Conflict(format!(
            "User {} has no pending request to end lock {}",
            rejector.id, lock.id
        )));
    }

    Ok(Changeset::default()
        .with_lock(LockWrite::Update {
            expected_version: lock.version,
            lock: Lock {
                reject_requested_by: None,
                ..lock.clone()
            },
        })
        .with_user(UserWrite::guard(rejector))
        .with_user(UserWrite::guard(counterpart)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::matching::model::{LockId, UserId};

    fn user(id: UserId, status: UserStatus, lock_id: Option<LockId>) -> UserAccount {
        UserAccount {
            id,
            name: format!("user-{id}"),
            status,
            lock_id,
            subscription_expires_at: None,
            version: 1,
        }
    }

    fn available(id: UserId) -> UserAccount {
        user(id, UserStatus::Available, None)
    }

    fn locked(id: UserId, lock_id: LockId) -> UserAccount {
        user(id, UserStatus::Locked, Some(lock_id))
    }

    fn active_lock(id: LockId, one_id: UserId, another_id: UserId) -> Lock {
        Lock {
            id,
            one_id,
            another_id,
            is_active: true,
            reject_requested_by: None,
            created_at: Utc::now(),
            ended_at: None,
            end_reason: None,
            ended_by: None,
            version: 1,
        }
    }

    fn asked(from_id: UserId, to_id: UserId) -> ConnectionRequest {
        ConnectionRequest {
            id: 100,
            from_id,
            to_id,
            status: RequestStatus::Asked,
            asked_date: Utc::now(),
            approved_date: None,
            rejected_date: None,
            withdraw_date: None,
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    #[test]
    fn create_inserts_an_asked_request() {
        let changes = plan_create_request(&available(1), &available(2), None, Utc::now()).unwrap();
        assert_matches!(
            changes.request,
            Some(RequestWrite::Insert { from_id: 1, to_id: 2, .. })
        );
        assert!(changes.users.is_empty());
    }

    #[test]
    fn create_to_self_conflicts() {
        let a = available(1);
        let result = plan_create_request(&a, &a, None, Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn create_with_open_request_conflicts() {
        let existing = asked(1, 2);
        let result = plan_create_request(&available(1), &available(2), Some(&existing), Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn create_towards_married_user_conflicts() {
        let married = user(2, UserStatus::Married, None);
        let result = plan_create_request(&available(1), &married, None, Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn withdraw_without_open_request_conflicts() {
        assert_matches!(plan_withdraw_request(None, Utc::now()), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn terminal_request_cannot_be_closed_again() {
        let mut accepted = asked(1, 2);
        accepted.status = RequestStatus::Accepted;
        assert_matches!(
            plan_decline_request(Some(&accepted), Utc::now()),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn accept_locks_both_users_to_the_new_lock() {
        let request = asked(2, 1);
        let changes =
            plan_accept_request(&available(1), &available(2), Some(&request), Utc::now()).unwrap();

        assert_matches!(
            changes.request,
            Some(RequestWrite::Transition { request_id: 100, status: RequestStatus::Accepted, .. })
        );
        assert_matches!(changes.lock, Some(LockWrite::Insert { one_id: 1, another_id: 2, .. }));
        assert_eq!(changes.users.len(), 2);
        assert!(changes
            .users
            .iter()
            .all(|u| u.status == UserStatus::Locked && u.lock == LockBinding::Created));
    }

    #[test]
    fn accept_while_already_locked_conflicts() {
        let request = asked(2, 1);
        let result =
            plan_accept_request(&locked(1, 50), &available(2), Some(&request), Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn accept_when_sender_is_locked_elsewhere_conflicts() {
        let request = asked(2, 1);
        let result =
            plan_accept_request(&available(1), &locked(2, 50), Some(&request), Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    #[test]
    fn outsider_cannot_withdraw_a_lock() {
        let lock = active_lock(7, 1, 2);
        let result = plan_withdraw_lock(&available(3), &locked(1, 7), &lock, Utc::now());
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn withdraw_releases_both_parties() {
        let lock = active_lock(7, 1, 2);
        let changes = plan_withdraw_lock(&locked(1, 7), &locked(2, 7), &lock, Utc::now()).unwrap();

        assert_matches!(
            &changes.lock,
            Some(LockWrite::Update { lock, .. })
                if !lock.is_active && lock.end_reason == Some(LockEnd::Withdrawn) && lock.ended_by == Some(1)
        );
        assert_eq!(changes.users.len(), 2);
        assert!(changes
            .users
            .iter()
            .all(|u| u.status == UserStatus::Available && u.lock == LockBinding::Unbound));
    }

    #[test]
    fn withdraw_leaves_an_unlinked_counterpart_alone() {
        let lock = active_lock(7, 1, 2);
        let changes =
            plan_withdraw_lock(&locked(1, 7), &available(2), &lock, Utc::now()).unwrap();
        assert_eq!(changes.users.len(), 1);
        assert_eq!(changes.users[0].user_id, 1);
    }

    #[test]
    fn withdraw_of_inactive_lock_conflicts() {
        let mut lock = active_lock(7, 1, 2);
        lock.is_active = false;
        let result = plan_withdraw_lock(&locked(1, 7), &locked(2, 7), &lock, Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn request_confirm_marks_only_the_notifier_pending() {
        let lock = active_lock(7, 1, 2);
        let changes = plan_request_confirm_locked(&locked(1, 7), &locked(2, 7), &lock).unwrap();

        let notifier = changes.users.iter().find(|u| u.user_id == 1).unwrap();
        let counterpart = changes.users.iter().find(|u| u.user_id == 2).unwrap();
        assert_eq!(notifier.status, UserStatus::PendingMarriageConfirmation);
        assert_eq!(counterpart.status, UserStatus::Locked);
        assert!(changes.couple.is_none());
    }

    #[test]
    fn request_confirm_with_stale_reciprocal_link_conflicts() {
        let lock = active_lock(7, 1, 2);
        let result = plan_request_confirm_locked(&locked(1, 7), &locked(2, 8), &lock);
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn request_confirm_blocked_by_pending_reject() {
        let mut lock = active_lock(7, 1, 2);
        lock.reject_requested_by = Some(2);
        let result = plan_request_confirm_locked(&locked(1, 7), &locked(2, 7), &lock);
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn confirm_success_marries_both_and_ends_the_lock() {
        let lock = active_lock(7, 1, 2);
        let claimant = user(1, UserStatus::PendingMarriageConfirmation, Some(7));
        let changes = plan_confirm_success(&locked(2, 7), &claimant, &lock, Utc::now()).unwrap();

        assert!(changes
            .users
            .iter()
            .all(|u| u.status == UserStatus::Married && u.lock == LockBinding::Unbound));
        assert_matches!(
            &changes.lock,
            Some(LockWrite::Update { lock, .. }) if lock.end_reason == Some(LockEnd::Married)
        );
        assert_matches!(changes.couple, Some(NewCouple { lock_id: 7, .. }));
    }

    #[test]
    fn confirm_success_without_pending_claim_conflicts() {
        let lock = active_lock(7, 1, 2);
        let result = plan_confirm_success(&locked(2, 7), &locked(1, 7), &lock, Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn decline_success_returns_claimant_to_locked() {
        let lock = active_lock(7, 1, 2);
        let claimant = user(1, UserStatus::PendingMarriageConfirmation, Some(7));
        let changes = plan_decline_success(&locked(2, 7), &claimant, &lock).unwrap();
        let write = changes.users.iter().find(|u| u.user_id == 1).unwrap();
        assert_eq!(write.status, UserStatus::Locked);
        assert_eq!(write.lock, LockBinding::Existing(7));
    }

    #[test]
    fn request_reject_records_intent_without_touching_statuses() {
        let lock = active_lock(7, 1, 2);
        let changes = plan_request_reject_locked(&locked(1, 7), &locked(2, 7), &lock).unwrap();

        assert_matches!(
            &changes.lock,
            Some(LockWrite::Update { lock, .. }) if lock.reject_requested_by == Some(1) && lock.is_active
        );
        assert!(changes.users.iter().all(|u| u.status == UserStatus::Locked));
    }

    #[test]
    fn second_reject_request_conflicts() {
        let mut lock = active_lock(7, 1, 2);
        lock.reject_requested_by = Some(1);
        let result = plan_request_reject_locked(&locked(2, 7), &locked(1, 7), &lock);
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn rejector_cannot_confirm_its_own_reject() {
        let mut lock = active_lock(7, 1, 2);
        lock.reject_requested_by = Some(1);
        let result = plan_confirm_reject(&locked(1, 7), &locked(2, 7), &lock, Utc::now());
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn confirm_reject_releases_both() {
        let mut lock = active_lock(7, 1, 2);
        lock.reject_requested_by = Some(1);
        let changes = plan_confirm_reject(&locked(2, 7), &locked(1, 7), &lock, Utc::now()).unwrap();
        assert!(changes
            .users
            .iter()
            .all(|u| u.status == UserStatus::Available && u.lock == LockBinding::Unbound));
        assert_matches!(
            &changes.lock,
            Some(LockWrite::Update { lock, .. })
                if lock.end_reason == Some(LockEnd::Rejected) && lock.reject_requested_by.is_none()
        );
    }

    #[test]
    fn only_the_rejector_can_cancel() {
        let mut lock = active_lock(7, 1, 2);
        lock.reject_requested_by = Some(1);
        assert!(plan_cancel_reject(&locked(1, 7), &locked(2, 7), &lock).is_ok());
        assert_matches!(
            plan_cancel_reject(&locked(2, 7), &locked(1, 7), &lock),
            Err(CoreError::Conflict(_))
        );
    }
}
