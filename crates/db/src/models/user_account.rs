//! `users` rows as seen by the matching workflow.

use serde::Deserialize;
use sqlx::FromRow;
use troth_core::matching::{UserAccount, UserStatus};
use troth_core::types::{DbId, Timestamp};

use super::status::{StatusCode, StatusId};

/// Full row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserAccountRow {
    pub id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub lock_id: Option<DbId>,
    pub subscription_expires_at: Option<Timestamp>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<UserAccountRow> for UserAccount {
    type Error = sqlx::Error;

    fn try_from(row: UserAccountRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            id: row.id,
            name: row.name,
            status: UserStatus::decode(row.status_id)?,
            lock_id: row.lock_id,
            subscription_expires_at: row.subscription_expires_at,
            version: row.version,
        })
    }
}

/// DTO for registering a user. Accounts start `Available` with no lock.
#[derive(Debug, Deserialize)]
pub struct CreateUserAccount {
    pub name: String,
    pub subscription_expires_at: Option<Timestamp>,
}
