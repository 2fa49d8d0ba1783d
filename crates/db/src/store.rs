//! [`MatchStore`] over Postgres.
//!
//! A commit runs in one transaction. Every guarded write carries the version
//! (or request status) its plan read, so a concurrent writer turns the
//! `UPDATE ... WHERE version = $n` into a no-op and the whole transaction is
//! rolled back as stale. The partial unique indexes on open requests and
//! active locks catch the races that inserts cannot guard by version.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use troth_core::matching::store::{LockBinding, LockWrite, RequestWrite};
use troth_core::matching::{
    Changeset, CommitReceipt, ConnectionRequest, Couple, Lock, LockId, MatchStore, StoreError,
    UserAccount, UserId,
};

use crate::models::status::StatusCode;
use crate::repositories::{ConnectionRequestRepo, CoupleRepo, LockRepo, UserAccountRepo};

/// Postgres SQLSTATE codes that mean "someone else got there first".
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Classify a sqlx error for the matching workflow.
///
/// Constraint and concurrency failures are stale writes; anything else is a
/// backend failure.
pub fn classify_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return StoreError::Stale(format!("Uniqueness rule {constraint} violated"));
            }
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                return StoreError::Stale(format!("Concurrent update: {db_err}"));
            }
            _ => {}
        }
    }
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        UserAccountRepo::find_by_id(&self.pool, id)
            .await
            .and_then(|row| row.map(UserAccount::try_from).transpose())
            .map_err(classify_sqlx_error)
    }

    async fn find_asked_request(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<ConnectionRequest>, StoreError> {
        ConnectionRequestRepo::find_asked(&self.pool, from_id, to_id)
            .await
            .and_then(|row| row.map(ConnectionRequest::try_from).transpose())
            .map_err(classify_sqlx_error)
    }

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionRequest>, StoreError> {
        ConnectionRequestRepo::list_for_user(&self.pool, user_id)
            .await
            .and_then(|rows| {
                rows.into_iter()
                    .map(ConnectionRequest::try_from)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(classify_sqlx_error)
    }

    async fn find_lock(&self, id: LockId) -> Result<Option<Lock>, StoreError> {
        LockRepo::find_by_id(&self.pool, id)
            .await
            .and_then(|row| row.map(Lock::try_from).transpose())
            .map_err(classify_sqlx_error)
    }

    async fn find_couple_for_user(&self, user_id: UserId) -> Result<Option<Couple>, StoreError> {
        CoupleRepo::find_for_user(&self.pool, user_id)
            .await
            .map(|row| row.map(Couple::from))
            .map_err(classify_sqlx_error)
    }

    async fn commit(&self, changes: Changeset) -> Result<CommitReceipt, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        // Dropping `tx` on the error path rolls everything back.
        let receipt = apply(&mut *tx, changes).await.inspect_err(|err| {
            tracing::debug!(error = %err, "Match commit rolled back");
        })?;
        tx.commit().await.map_err(classify_sqlx_error)?;
        Ok(receipt)
    }
}

async fn apply(conn: &mut PgConnection, changes: Changeset) -> Result<CommitReceipt, StoreError> {
    if changes.binds_created_lock() && !matches!(changes.lock, Some(LockWrite::Insert { .. })) {
        return Err(StoreError::Backend(
            "Changeset binds users to a lock it does not create".into(),
        ));
    }

    let mut receipt = CommitReceipt::default();

    let mut created_lock: Option<LockId> = None;
    match &changes.lock {
        Some(LockWrite::Insert {
            one_id,
            another_id,
            created_at,
        }) => {
            let row = LockRepo::insert_active(&mut *conn, *one_id, *another_id, *created_at)
                .await
                .map_err(classify_sqlx_error)?;
            let lock = Lock::try_from(row).map_err(classify_sqlx_error)?;
            created_lock = Some(lock.id);
            receipt.lock = Some(lock);
        }
        Some(LockWrite::Update {
            expected_version,
            lock,
        }) => {
            let row = LockRepo::update_guarded(&mut *conn, lock, *expected_version)
                .await
                .map_err(classify_sqlx_error)?
                .ok_or_else(|| {
                    StoreError::Stale(format!(
                        "Lock {} changed since version {expected_version}",
                        lock.id
                    ))
                })?;
            receipt.lock = Some(Lock::try_from(row).map_err(classify_sqlx_error)?);
        }
        None => {}
    }

    // Fixed row order keeps two commits touching the same pair from deadlocking.
    let mut users = changes.users;
    users.sort_by_key(|write| write.user_id);
    for write in &users {
        let lock_id = match write.lock {
            LockBinding::Unbound => None,
            LockBinding::Existing(id) => Some(id),
            LockBinding::Created => created_lock,
        };
        UserAccountRepo::update_guarded(
            &mut *conn,
            write.user_id,
            write.expected_version,
            write.status.id(),
            lock_id,
        )
        .await
        .map_err(classify_sqlx_error)?
        .ok_or_else(|| {
            StoreError::Stale(format!(
                "User {} changed since version {}",
                write.user_id, write.expected_version
            ))
        })?;
    }

    match changes.request {
        Some(RequestWrite::Insert {
            from_id,
            to_id,
            asked_date,
        }) => {
            let row = ConnectionRequestRepo::insert_asked(&mut *conn, from_id, to_id, asked_date)
                .await
                .map_err(classify_sqlx_error)?;
            receipt.request = Some(ConnectionRequest::try_from(row).map_err(classify_sqlx_error)?);
        }
        Some(RequestWrite::Transition {
            request_id,
            status,
            at,
        }) => {
            let row = ConnectionRequestRepo::transition(&mut *conn, request_id, status, at)
                .await
                .map_err(classify_sqlx_error)?
                .ok_or_else(|| {
                    StoreError::Stale(format!("Request {request_id} is no longer asked"))
                })?;
            receipt.request = Some(ConnectionRequest::try_from(row).map_err(classify_sqlx_error)?);
        }
        None => {}
    }

    if let Some(new_couple) = &changes.couple {
        let row = CoupleRepo::insert(&mut *conn, new_couple)
            .await
            .map_err(classify_sqlx_error)?;
        receipt.couple = Some(Couple::from(row));
    }

    Ok(receipt)
}
