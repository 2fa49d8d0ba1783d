use sqlx::FromRow;
use troth_core::matching::{ConnectionRequest, RequestStatus};
use troth_core::types::{DbId, Timestamp};

use super::status::{StatusCode, StatusId};

/// Full row from the `connection_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct ConnectionRequestRow {
    pub id: DbId,
    pub from_id: DbId,
    pub to_id: DbId,
    pub status_id: StatusId,
    pub asked_date: Timestamp,
    pub approved_date: Option<Timestamp>,
    pub rejected_date: Option<Timestamp>,
    pub withdraw_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ConnectionRequestRow> for ConnectionRequest {
    type Error = sqlx::Error;

    fn try_from(row: ConnectionRequestRow) -> Result<Self, Self::Error> {
        Ok(ConnectionRequest {
            id: row.id,
            from_id: row.from_id,
            to_id: row.to_id,
            status: RequestStatus::decode(row.status_id)?,
            asked_date: row.asked_date,
            approved_date: row.approved_date,
            rejected_date: row.rejected_date,
            withdraw_date: row.withdraw_date,
        })
    }
}
