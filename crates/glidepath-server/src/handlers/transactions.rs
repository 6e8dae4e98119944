//! Transaction ledger read handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, MAX_PAGE_LIMIT};
use glidepath_core::models::Transaction;

#[derive(Deserialize)]
pub struct TransactionParams {
    pub limit: Option<i64>,
}

/// GET /api/transactions - The caller's most recent transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let limit = params.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT);
    let transactions = state.db.list_recent_transactions(&user_id, limit)?;
    Ok(Json(transactions))
}
