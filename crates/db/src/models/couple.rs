use sqlx::FromRow;
use troth_core::matching::Couple;
use troth_core::types::{DbId, Timestamp};

/// Full row from the `couples` table.
#[derive(Debug, Clone, FromRow)]
pub struct CoupleRow {
    pub id: DbId,
    pub one_id: DbId,
    pub another_id: DbId,
    pub lock_id: DbId,
    pub married_date: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<CoupleRow> for Couple {
    fn from(row: CoupleRow) -> Self {
        Couple {
            id: row.id,
            one_id: row.one_id,
            another_id: row.another_id,
            lock_id: row.lock_id,
            married_date: row.married_date,
        }
    }
}
