//! Repository for the `connection_requests` table.

use sqlx::{PgConnection, PgPool};
use troth_core::matching::RequestStatus;
use troth_core::types::{DbId, Timestamp};

use crate::models::connection_request::ConnectionRequestRow;
use crate::models::status::StatusCode;

const COLUMNS: &str = "id, from_id, to_id, status_id, asked_date, approved_date, \
                       rejected_date, withdraw_date, created_at, updated_at";

pub struct ConnectionRequestRepo;

impl ConnectionRequestRepo {
    /// The open request for the ordered pair, if any.
    pub async fn find_asked(
        pool: &PgPool,
        from_id: DbId,
        to_id: DbId,
    ) -> Result<Option<ConnectionRequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connection_requests
             WHERE from_id = $1 AND to_id = $2 AND status_id = $3"
        );
        sqlx::query_as::<_, ConnectionRequestRow>(&query)
            .bind(from_id)
            .bind(to_id)
            .bind(RequestStatus::Asked.id())
            .fetch_optional(pool)
            .await
    }

    /// Every request sent or received by the user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ConnectionRequestRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connection_requests
             WHERE from_id = $1 OR to_id = $1
             ORDER BY asked_date DESC, id DESC"
        );
        sqlx::query_as::<_, ConnectionRequestRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Insert an `Asked` request. A second open request for the same pair
    /// violates `uq_connection_requests_asked_pair`.
    pub async fn insert_asked(
        conn: &mut PgConnection,
        from_id: DbId,
        to_id: DbId,
        asked_date: Timestamp,
    ) -> Result<ConnectionRequestRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO connection_requests (from_id, to_id, status_id, asked_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectionRequestRow>(&query)
            .bind(from_id)
            .bind(to_id)
            .bind(RequestStatus::Asked.id())
            .bind(asked_date)
            .fetch_one(conn)
            .await
    }

    /// Move an `Asked` request to `status` and stamp the matching date column.
    ///
    /// Returns `None` if the request is gone or no longer `Asked`.
    pub async fn transition(
        conn: &mut PgConnection,
        id: DbId,
        status: RequestStatus,
        at: Timestamp,
    ) -> Result<Option<ConnectionRequestRow>, sqlx::Error> {
        let Some(date_column) = date_column(status) else {
            return Err(sqlx::Error::Protocol(format!(
                "Cannot transition request {id} back to {status}"
            )));
        };
        let query = format!(
            "UPDATE connection_requests SET
                status_id = $2,
                {date_column} = $3
             WHERE id = $1 AND status_id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectionRequestRow>(&query)
            .bind(id)
            .bind(status.id())
            .bind(at)
            .bind(RequestStatus::Asked.id())
            .fetch_optional(conn)
            .await
    }
}

fn date_column(status: RequestStatus) -> Option<&'static str> {
    match status {
        RequestStatus::Accepted => Some("approved_date"),
        RequestStatus::Declined => Some("rejected_date"),
        RequestStatus::Withdrawn => Some("withdraw_date"),
        RequestStatus::Asked => None,
    }
}
