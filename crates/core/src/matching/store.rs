//! Persistence seam for the matching workflow.
//!
//! Managers never write records one at a time. They read a snapshot, plan a
//! [`Changeset`] against it, and hand the whole changeset to
//! [`MatchStore::commit`]. A store must apply a changeset atomically and must
//! reject it with [`StoreError::Stale`] if any record it touches no longer
//! matches the version (or request status) the plan was built from.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::model::{ConnectionRequest, Couple, Lock, LockId, UserAccount, UserId};
use super::status::{RequestStatus, UserStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An expected version/status did not match at commit time, or a
    /// uniqueness rule (one asked request per pair, one active lock per
    /// user) would be broken. Nothing was written.
    #[error("Stale write: {0}")]
    Stale(String),

    /// The backend failed. Nothing was written.
    #[error("Store backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Stale(msg) => CoreError::Conflict(msg),
            StoreError::Backend(msg) => CoreError::Persistence(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Changeset
// ---------------------------------------------------------------------------

/// What a user's lock reference should become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBinding {
    Unbound,
    Existing(LockId),
    /// The lock inserted by the same changeset.
    Created,
}

/// Version-checked write of a user's status and lock reference.
#[derive(Debug, Clone, PartialEq)]
pub struct UserWrite {
    pub user_id: UserId,
    pub expected_version: i64,
    pub status: UserStatus,
    pub lock: LockBinding,
}

impl UserWrite {
    /// Rewrite the user's current state unchanged. Used to pin a record that
    /// the plan depends on but does not modify.
    pub fn guard(user: &UserAccount) -> Self {
        Self {
            user_id: user.id,
            expected_version: user.version,
            status: user.status,
            lock: match user.lock_id {
                Some(id) => LockBinding::Existing(id),
                None => LockBinding::Unbound,
            },
        }
    }

    pub fn set(user: &UserAccount, status: UserStatus, lock: LockBinding) -> Self {
        Self {
            user_id: user.id,
            expected_version: user.version,
            status,
            lock,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestWrite {
    /// Insert an `Asked` request. Fails as stale if the pair already has one.
    Insert {
        from_id: UserId,
        to_id: UserId,
        asked_date: Timestamp,
    },
    /// Move an `Asked` request to a terminal status and stamp the matching
    /// date column. Fails as stale if the request is no longer `Asked`.
    Transition {
        request_id: DbId,
        status: RequestStatus,
        at: Timestamp,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockWrite {
    /// Insert an active lock. Fails as stale if either party already holds
    /// an active lock.
    Insert {
        one_id: UserId,
        another_id: UserId,
        created_at: Timestamp,
    },
    /// Overwrite the mutable lock fields with those of `lock`.
    Update { expected_version: i64, lock: Lock },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCouple {
    pub one_id: UserId,
    pub another_id: UserId,
    pub lock_id: LockId,
    pub married_date: Timestamp,
}

/// A unit of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub users: Vec<UserWrite>,
    pub request: Option<RequestWrite>,
    pub lock: Option<LockWrite>,
    pub couple: Option<NewCouple>,
}

impl Changeset {
    pub fn with_user(mut self, write: UserWrite) -> Self {
        self.users.push(write);
        self
    }

    pub fn with_request(mut self, write: RequestWrite) -> Self {
        self.request = Some(write);
        self
    }

    pub fn with_lock(mut self, write: LockWrite) -> Self {
        self.lock = Some(write);
        self
    }

    pub fn with_couple(mut self, couple: NewCouple) -> Self {
        self.couple = Some(couple);
        self
    }

    /// Whether any user write binds to the lock inserted by this changeset.
    pub fn binds_created_lock(&self) -> bool {
        self.users.iter().any(|u| u.lock == LockBinding::Created)
    }
}

/// Records produced or updated by a successful commit.
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    pub request: Option<ConnectionRequest>,
    pub lock: Option<Lock>,
    pub couple: Option<Couple>,
}

// ---------------------------------------------------------------------------
// MatchStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// The open (`Asked`) request for the ordered pair, if any.
    async fn find_asked_request(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<ConnectionRequest>, StoreError>;

    /// Every request sent or received by the user, newest first.
    async fn list_requests_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionRequest>, StoreError>;

    async fn find_lock(&self, id: LockId) -> Result<Option<Lock>, StoreError>;

    async fn find_couple_for_user(&self, user_id: UserId) -> Result<Option<Couple>, StoreError>;

    /// Apply the changeset atomically.
    async fn commit(&self, changes: Changeset) -> Result<CommitReceipt, StoreError>;
}
