//! Records owned by the match store.
//!
//! Users never hold each other directly. An active lock is referenced from
//! both users by its id, and the counterpart is resolved through the lock.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

use super::status::{LockEnd, RequestStatus, UserStatus};

pub type UserId = DbId;
pub type LockId = DbId;

// ---------------------------------------------------------------------------
// UserAccount
// ---------------------------------------------------------------------------

/// The slice of a user record the matching workflow reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub status: UserStatus,
    /// Set iff `status.holds_lock()`.
    pub lock_id: Option<LockId>,
    pub subscription_expires_at: Option<Timestamp>,
    /// Compare-and-swap token, bumped on every write.
    pub version: i64,
}

impl UserAccount {
    pub fn is_bound_to(&self, lock_id: LockId) -> bool {
        self.lock_id == Some(lock_id)
    }

    /// Whether the user is free to enter a new lock.
    pub fn is_available(&self) -> bool {
        self.status == UserStatus::Available && self.lock_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRequest
// ---------------------------------------------------------------------------

/// A directed proposal from `from_id` to `to_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: DbId,
    pub from_id: UserId,
    pub to_id: UserId,
    pub status: RequestStatus,
    pub asked_date: Timestamp,
    pub approved_date: Option<Timestamp>,
    pub rejected_date: Option<Timestamp>,
    pub withdraw_date: Option<Timestamp>,
}

impl ConnectionRequest {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// An exclusive courtship between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub one_id: UserId,
    pub another_id: UserId,
    pub is_active: bool,
    /// Party that asked to dissolve the lock and is waiting for the
    /// counterpart to confirm.
    pub reject_requested_by: Option<UserId>,
    pub created_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub end_reason: Option<LockEnd>,
    pub ended_by: Option<UserId>,
    pub version: i64,
}

impl Lock {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.one_id == user_id || self.another_id == user_id
    }

    /// The other party, or `None` if `user_id` is not part of this lock.
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        if self.one_id == user_id {
            Some(self.another_id)
        } else if self.another_id == user_id {
            Some(self.one_id)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Couple
// ---------------------------------------------------------------------------

/// Terminal marriage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Couple {
    pub id: DbId,
    pub one_id: UserId,
    pub another_id: UserId,
    pub lock_id: LockId,
    pub married_date: Timestamp,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn lock(one_id: UserId, another_id: UserId) -> Lock {
        Lock {
            id: 9,
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

    #[test]
    fn counterpart_resolves_in_both_directions() {
        let l = lock(1, 2);
        assert_eq!(l.counterpart_of(1), Some(2));
        assert_eq!(l.counterpart_of(2), Some(1));
        assert_eq!(l.counterpart_of(3), None);
    }

    #[test]
    fn involves_only_the_two_parties() {
        let l = lock(1, 2);
        assert!(l.involves(1));
        assert!(l.involves(2));
        assert!(!l.involves(7));
    }

    #[test]
    fn a_locked_user_is_not_available() {
        let user = UserAccount {
            id: 1,
            name: "Asha".into(),
            status: UserStatus::Locked,
            lock_id: Some(9),
            subscription_expires_at: None,
            version: 3,
        };
        assert!(!user.is_available());
        assert!(user.is_bound_to(9));
        assert!(!user.is_bound_to(10));
    }
}
