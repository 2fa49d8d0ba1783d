//! Route definitions for per-user views.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET /{id}/requests          -> list_requests
/// GET /{id}/request-actions   -> request_actions
/// GET /{id}/lock              -> relationship
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/requests", get(users::list_requests))
        .route("/{id}/request-actions", get(users::request_actions))
        .route("/{id}/lock", get(users::relationship))
}
