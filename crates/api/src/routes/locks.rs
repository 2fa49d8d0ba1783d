//! Route definitions for the `/locks` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Routes mounted at `/locks`.
///
/// ```text
/// POST /{lock_id}/withdraw   -> withdraw_lock
/// POST /confirm/request      -> request_confirm
/// POST /confirm/accept       -> accept_confirm
/// POST /confirm/decline      -> decline_confirm
/// POST /reject/request       -> request_reject
/// POST /reject/accept        -> accept_reject
/// POST /reject/cancel        -> cancel_reject
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{lock_id}/withdraw", post(locks::withdraw_lock))
        .route("/confirm/request", post(locks::request_confirm))
        .route("/confirm/accept", post(locks::accept_confirm))
        .route("/confirm/decline", post(locks::decline_confirm))
        .route("/reject/request", post(locks::request_reject))
        .route("/reject/accept", post(locks::accept_reject))
        .route("/reject/cancel", post(locks::cancel_reject))
}
