//! Handlers for the connection-request lifecycle.
//!
//! Every endpoint answers 200 with a `{ success, message }` outcome when the
//! business rules refuse the transition; only identity and existence
//! failures become HTTP errors.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use troth_core::matching::MatchOutcome;
use troth_core::types::DbId;

use super::ensure_id;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// The ordered pair a request is keyed by.
#[derive(Debug, Deserialize)]
pub struct RequestPair {
    pub from_id: DbId,
    pub to_id: DbId,
}

impl RequestPair {
    fn validate(&self) -> AppResult<()> {
        ensure_id("from_id", self.from_id)?;
        ensure_id("to_id", self.to_id)
    }
}

/// POST /api/v1/requests
pub async fn create_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RequestPair>,
) -> AppResult<Json<DataResponse<MatchOutcome>>> {
    input.validate()?;
    let outcome = state
        .requests
        .create_request(auth.user_id, input.from_id, input.to_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/requests/withdraw
pub async fn withdraw_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RequestPair>,
) -> AppResult<Json<DataResponse<MatchOutcome>>> {
    input.validate()?;
    let outcome = state
        .requests
        .withdraw_request(auth.user_id, input.from_id, input.to_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/requests/accept
///
/// The caller must be `to_id`. On success both users are locked together.
pub async fn accept_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RequestPair>,
) -> AppResult<Json<DataResponse<MatchOutcome>>> {
    input.validate()?;
    let outcome = state
        .requests
        .accept_request(auth.user_id, input.to_id, input.from_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/requests/decline
pub async fn decline_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RequestPair>,
) -> AppResult<Json<DataResponse<MatchOutcome>>> {
    input.validate()?;
    let outcome = state
        .requests
        .decline_request(auth.user_id, input.to_id, input.from_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}
