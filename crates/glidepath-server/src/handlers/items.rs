//! Item linking and disconnect handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{get_user_id, AppError, AppState};
use glidepath_core::models::Item;

/// Request body for completing a link flow
#[derive(Debug, Deserialize)]
pub struct LinkItemRequest {
    /// Stable item id assigned by the aggregator during the link flow
    pub external_item_id: String,
    /// Opaque access credential exchanged at the end of the link flow
    pub access_credential: String,
    pub institution_name: Option<String>,
    pub institution_id: Option<String>,
}

/// POST /api/plaid/link - Register a newly linked institution
///
/// Returns 409 when the institution is already linked for this user. On
/// success an immediate account sync runs best-effort so the new accounts
/// show up without waiting for the next refresh.
pub async fn link_item(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Item>, AppError> {
    let user_id = get_user_id(request.headers(), &state.config)?;

    // Extract JSON body
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: LinkItemRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    if req.external_item_id.is_empty() || req.access_credential.is_empty() {
        return Err(AppError::bad_request(
            "external_item_id and access_credential are required",
        ));
    }

    let item = state.db.register_item(
        &user_id,
        &req.external_item_id,
        &req.access_credential,
        req.institution_name.as_deref(),
        req.institution_id.as_deref(),
    )?;

    // Best-effort initial refresh; a failure here is not a linking failure,
    // the next sync trigger picks the item up
    if let Ok(service) = super::sync_service(&state) {
        if let Err(e) = service.sync_accounts(&user_id).await {
            warn!(item_id = item.id, error = %e, "Initial account sync after link failed");
        }
    }

    Ok(Json(item))
}

/// GET /api/items - List the caller's linked institutions
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Item>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let items = state.db.list_items(&user_id)?;
    Ok(Json(items))
}

/// Response body for a disconnect
#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

/// DELETE /api/plaid/items/:id - Disconnect one linked institution
///
/// Ownership-checked; 404 when the item does not belong to the caller.
/// Local data is removed even when the aggregator rejects the revocation;
/// the degraded outcome is surfaced in the message.
pub async fn disconnect_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<DisconnectResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let manager = super::revocation_manager(&state)?;
    let outcome = manager.disconnect_item(&user_id, item_id).await?;

    let message = if outcome.credential_revoked {
        "Item disconnected".to_string()
    } else {
        "Item disconnected; the aggregator credential could not be revoked and may remain \
         active upstream"
            .to_string()
    };

    Ok(Json(DisconnectResponse {
        success: true,
        message,
    }))
}
