//! Repository for the `couples` table.

use sqlx::{PgConnection, PgPool};
use troth_core::matching::store::NewCouple;
use troth_core::types::DbId;

use crate::models::couple::CoupleRow;

const COLUMNS: &str = "id, one_id, another_id, lock_id, married_date, created_at, updated_at";

pub struct CoupleRepo;

impl CoupleRepo {
    pub async fn find_for_user(pool: &PgPool, user_id: DbId) -> Result<Option<CoupleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM couples WHERE one_id = $1 OR another_id = $1"
        );
        sqlx::query_as::<_, CoupleRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(conn: &mut PgConnection, input: &NewCouple) -> Result<CoupleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO couples (one_id, another_id, lock_id, married_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CoupleRow>(&query)
            .bind(input.one_id)
            .bind(input.another_id)
            .bind(input.lock_id)
            .bind(input.married_date)
            .fetch_one(conn)
            .await
    }
}
