//! Handlers for lock withdrawal and the confirm/reject handshakes.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use troth_core::matching::MatchOutcome;
use troth_core::types::DbId;

use super::ensure_id;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// The user acting on its own lock.
#[derive(Debug, Deserialize)]
pub struct LockActor {
    pub user_id: DbId,
}

type OutcomeResponse = AppResult<Json<DataResponse<MatchOutcome>>>;

/// POST /api/v1/locks/{lock_id}/withdraw
pub async fn withdraw_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lock_id): Path<DbId>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("lock_id", lock_id)?;
    ensure_id("user_id", input.user_id)?;
    let outcome = state
        .locks
        .withdraw_lock(auth.user_id, input.user_id, lock_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/confirm/request
pub async fn request_confirm(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state
        .locks
        .request_confirm_locked(auth.user_id, input.user_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/confirm/accept
pub async fn accept_confirm(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state.locks.confirm_success(auth.user_id, input.user_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/confirm/decline
pub async fn decline_confirm(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state.locks.decline_success(auth.user_id, input.user_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/reject/request
pub async fn request_reject(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state
        .locks
        .request_reject_locked(auth.user_id, input.user_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/reject/accept
pub async fn accept_reject(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state.locks.confirm_reject(auth.user_id, input.user_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/locks/reject/cancel
pub async fn cancel_reject(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockActor>,
) -> OutcomeResponse {
    ensure_id("user_id", input.user_id)?;
    let outcome = state.locks.cancel_reject(auth.user_id, input.user_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}
