//! Spending report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState};
use glidepath_core::models::CategorySummary;
use glidepath_core::sync::SyncService;

#[derive(Deserialize)]
pub struct SummaryParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/reports/summary - Category spending summary over a date range
///
/// Defaults to the trailing 90-day window when no range is given.
pub async fn spending_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
    headers: HeaderMap,
) -> Result<Json<CategorySummary>, AppError> {
    let user_id = get_user_id(&headers, &state.config)?;

    let (default_from, default_to) = SyncService::default_window();
    let from = params.from.unwrap_or(default_from);
    let to = params.to.unwrap_or(default_to);

    if from > to {
        return Err(AppError::bad_request("'from' must not be after 'to'"));
    }

    let summary = state.db.category_summary(&user_id, from, to)?;
    Ok(Json(summary))
}
