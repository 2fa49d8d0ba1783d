pub mod health;
pub mod locks;
pub mod requests;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /requests                         create (POST)
/// /requests/withdraw                withdraw (POST)
/// /requests/accept                  accept (POST)
/// /requests/decline                 decline (POST)
///
/// /users/{id}/requests              request dashboard (GET)
/// /users/{id}/request-actions       profile action flags (GET)
/// /users/{id}/lock                  current relationship (GET)
///
/// /locks/{lock_id}/withdraw         withdraw lock (POST)
/// /locks/confirm/{request,accept,decline}
/// /locks/reject/{request,accept,cancel}
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/requests", requests::router())
        .nest("/users", users::router())
        .nest("/locks", locks::router())
}
