//! Repository for the `locks` table.

use sqlx::{PgConnection, PgPool};
use troth_core::matching::Lock;
use troth_core::types::{DbId, Timestamp};

use crate::models::lock::LockRow;
use crate::models::status::StatusCode;

const COLUMNS: &str = "id, one_id, another_id, is_active, reject_requested_by, ended_at, \
                       end_reason_id, ended_by, version, created_at, updated_at";

pub struct LockRepo;

impl LockRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LockRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locks WHERE id = $1");
        sqlx::query_as::<_, LockRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert an active lock. Violates `uq_locks_active_*` if either party
    /// already holds one.
    pub async fn insert_active(
        conn: &mut PgConnection,
        one_id: DbId,
        another_id: DbId,
        created_at: Timestamp,
    ) -> Result<LockRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO locks (one_id, another_id, is_active, created_at)
             VALUES ($1, $2, true, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LockRow>(&query)
            .bind(one_id)
            .bind(another_id)
            .bind(created_at)
            .fetch_one(conn)
            .await
    }

    /// Overwrite the mutable fields with those of `lock` if the row is still
    /// at `expected_version`.
    pub async fn update_guarded(
        conn: &mut PgConnection,
        lock: &Lock,
        expected_version: i64,
    ) -> Result<Option<LockRow>, sqlx::Error> {
        let query = format!(
            "UPDATE locks SET
                is_active = $3,
                reject_requested_by = $4,
                ended_at = $5,
                end_reason_id = $6,
                ended_by = $7,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LockRow>(&query)
            .bind(lock.id)
            .bind(expected_version)
            .bind(lock.is_active)
            .bind(lock.reject_requested_by)
            .bind(lock.ended_at)
            .bind(lock.end_reason.map(StatusCode::id))
            .bind(lock.ended_by)
            .fetch_optional(conn)
            .await
    }
}
