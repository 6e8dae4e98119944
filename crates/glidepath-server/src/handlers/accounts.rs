//! Account mirror read handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, MAX_PAGE_LIMIT};
use glidepath_core::models::{Account, BalanceSample};

/// GET /api/accounts - List the caller's mirrored accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let accounts = state.db.list_accounts(&user_id)?;
    Ok(Json(accounts))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

/// GET /api/accounts/:id/history - Balance samples for one account,
/// newest first
pub async fn account_history(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<BalanceSample>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    // Ownership check before the history read
    state
        .db
        .get_account(&user_id, account_id)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", account_id)))?;

    let limit = params.limit.unwrap_or(90).clamp(1, MAX_PAGE_LIMIT);
    let samples = state.db.list_balance_history(&user_id, account_id, limit)?;
    Ok(Json(samples))
}
