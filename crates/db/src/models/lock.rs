use sqlx::FromRow;
use troth_core::matching::{Lock, LockEnd};
use troth_core::types::{DbId, Timestamp};

use super::status::{StatusCode, StatusId};

/// Full row from the `locks` table.
#[derive(Debug, Clone, FromRow)]
pub struct LockRow {
    pub id: DbId,
    pub one_id: DbId,
    pub another_id: DbId,
    pub is_active: bool,
    pub reject_requested_by: Option<DbId>,
    pub ended_at: Option<Timestamp>,
    pub end_reason_id: Option<StatusId>,
    pub ended_by: Option<DbId>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<LockRow> for Lock {
    type Error = sqlx::Error;

    fn try_from(row: LockRow) -> Result<Self, Self::Error> {
        Ok(Lock {
            id: row.id,
            one_id: row.one_id,
            another_id: row.another_id,
            is_active: row.is_active,
            reject_requested_by: row.reject_requested_by,
            created_at: row.created_at,
            ended_at: row.ended_at,
            end_reason: row.end_reason_id.map(LockEnd::decode).transpose()?,
            ended_by: row.ended_by,
            version: row.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn ended_row_carries_reason() {
        let now = Utc::now();
        let row = LockRow {
            id: 3,
            one_id: 1,
            another_id: 2,
            is_active: false,
            reject_requested_by: None,
            ended_at: Some(now),
            end_reason_id: Some(3),
            ended_by: Some(2),
            version: 4,
            created_at: now,
            updated_at: now,
        };
        let lock = Lock::try_from(row).unwrap();
        assert_eq!(lock.end_reason, Some(LockEnd::Married));
        assert_eq!(lock.counterpart_of(2), Some(1));
    }
}
