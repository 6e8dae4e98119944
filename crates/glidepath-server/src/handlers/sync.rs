//! Sync trigger handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use chrono::NaiveDate;
use serde::Serialize;

use crate::{get_user_id, AppError, AppState};
use glidepath_core::models::{CategorySummary, ItemSyncError, SyncStatus};
use glidepath_core::sync::SyncService;

/// Response body for an account refresh
#[derive(Serialize)]
pub struct SyncAccountsResponse {
    pub success: bool,
    pub synced_count: i64,
    pub errors: Vec<ItemSyncError>,
}

/// POST /api/sync/accounts - Refresh balances for every linked institution
///
/// Returns 200 even when some institutions failed; callers inspect the
/// errors list for partial failure. A user with no linked items gets a
/// successful empty result.
pub async fn sync_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SyncAccountsResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let service = super::sync_service(&state)?;
    let outcome = service.sync_accounts(&user_id).await?;

    Ok(Json(SyncAccountsResponse {
        success: true,
        synced_count: outcome.total_synced,
        errors: outcome.errors,
    }))
}

#[derive(Serialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Response body for a transaction refresh
#[derive(Serialize)]
pub struct SyncTransactionsResponse {
    pub success: bool,
    pub transaction_count: i64,
    pub date_range: DateRange,
    /// Spending rollup over the synced window, so clients don't need a
    /// second round trip after a refresh
    pub summary: CategorySummary,
    pub errors: Vec<ItemSyncError>,
}

/// POST /api/sync/transactions - Refresh transactions over the trailing
/// 90-day window
pub async fn sync_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SyncTransactionsResponse>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let service = super::sync_service(&state)?;
    let (start_date, end_date) = SyncService::default_window();
    let outcome = service
        .sync_transactions(&user_id, start_date, end_date)
        .await?;

    let summary = state.db.category_summary(&user_id, start_date, end_date)?;

    Ok(Json(SyncTransactionsResponse {
        success: true,
        transaction_count: outcome.total_synced,
        date_range: DateRange {
            start_date: outcome.start_date,
            end_date: outcome.end_date,
        },
        summary,
        errors: outcome.errors,
    }))
}

/// GET /api/sync/status - Per-item sync bookkeeping for the caller
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SyncStatus>>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;
    let statuses = state.db.list_sync_statuses(&user_id)?;
    Ok(Json(statuses))
}
