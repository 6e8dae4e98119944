//! Account-data deletion handler

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::{get_user_id, AppError, AppState};

/// Response body for a full deletion
#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    /// How many aggregator credentials were actually revoked; lower than
    /// the number of linked items when some revocations failed
    pub revoked_count: i64,
}

/// DELETE /api/user - Delete every row the caller owns
///
/// Each item's credential is revoked independently; local deletion runs
/// regardless, so no orphaned data survives a flaky aggregator.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let manager = super::revocation_manager(&state)?;
    let outcome = manager.delete_all_user_data(&user_id).await?;

    Ok(Json(DeleteUserResponse {
        success: true,
        revoked_count: outcome.credentials_revoked,
    }))
}
