pub mod locks;
pub mod requests;
pub mod users;

use troth_core::types::DbId;

use crate::error::{AppError, AppResult};

/// Reject ids that can never name a row before touching the store.
pub(crate) fn ensure_id(field: &str, id: DbId) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::BadRequest(format!(
            "{field} must be a positive id, got {id}"
        )));
    }
    Ok(())
}
