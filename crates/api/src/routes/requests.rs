//! Route definitions for the `/requests` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// POST /            -> create_request
/// POST /withdraw    -> withdraw_request
/// POST /accept      -> accept_request
/// POST /decline     -> decline_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(requests::create_request))
        .route("/withdraw", post(requests::withdraw_request))
        .route("/accept", post(requests::accept_request))
        .route("/decline", post(requests::decline_request))
}
