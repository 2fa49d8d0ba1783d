//! Repository for the `users` table.

use sqlx::{PgConnection, PgPool};
use troth_core::types::DbId;

use crate::models::status::StatusId;
use crate::models::user_account::{CreateUserAccount, UserAccountRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, status_id, lock_id, subscription_expires_at, version, \
                       created_at, updated_at";

pub struct UserAccountRepo;

impl UserAccountRepo {
    /// Insert a new available user, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUserAccount,
    ) -> Result<UserAccountRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, subscription_expires_at)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserAccountRow>(&query)
            .bind(&input.name)
            .bind(input.subscription_expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserAccountRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserAccountRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set status and lock reference if the row is still at `expected_version`.
    ///
    /// Returns `None` when the version moved on (or the row is gone).
    pub async fn update_guarded(
        conn: &mut PgConnection,
        id: DbId,
        expected_version: i64,
        status_id: StatusId,
        lock_id: Option<DbId>,
    ) -> Result<Option<UserAccountRow>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                status_id = $3,
                lock_id = $4,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserAccountRow>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(status_id)
            .bind(lock_id)
            .fetch_optional(conn)
            .await
    }
}
