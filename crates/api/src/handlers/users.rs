//! Read-only views of a user's requests and relationship.

use axum::extract::{Path, State};
use axum::Json;
use troth_core::matching::{ConnectionRequest, RelationshipView, RequestActions};
use troth_core::types::DbId;

use super::ensure_id;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{id}/requests
///
/// Every request the user sent or received, newest first. Owner only.
pub async fn list_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ConnectionRequest>>>> {
    ensure_id("id", user_id)?;
    let requests = state.requests.list_requests(auth.user_id, user_id).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/v1/users/{id}/request-actions
///
/// Which request buttons the caller should see on user `id`'s profile.
pub async fn request_actions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(profile_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RequestActions>>> {
    ensure_id("id", profile_id)?;
    let actions = state.requests.request_actions(auth.user_id, profile_id).await?;
    Ok(Json(DataResponse { data: actions }))
}

/// GET /api/v1/users/{id}/lock
pub async fn relationship(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RelationshipView>>> {
    ensure_id("id", user_id)?;
    let view = state.locks.relationship(auth.user_id, user_id).await?;
    Ok(Json(DataResponse { data: view }))
}
