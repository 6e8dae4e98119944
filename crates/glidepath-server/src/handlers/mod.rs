//! Request handlers
//!
//! Handlers are organized by domain:
//! - `items` - Link-flow completion, item listing, disconnect
//! - `sync` - Account and transaction refresh triggers, sync status
//! - `accounts` - Account mirror and balance history reads
//! - `transactions` - Transaction ledger reads
//! - `reports` - Spending summaries
//! - `user` - Full account-data deletion

mod accounts;
mod items;
mod reports;
mod sync;
mod transactions;
mod user;

pub use accounts::*;
pub use items::*;
pub use reports::*;
pub use sync::*;
pub use transactions::*;
pub use user::*;

use glidepath_core::revoke::RevocationManager;
use glidepath_core::sync::SyncService;

use crate::{AppError, AppState};

/// Build a sync service, or fail with 503 when no aggregator is configured
///
/// A missing aggregator is a whole-operation configuration error, distinct
/// from a single institution failing mid-run.
fn sync_service(state: &AppState) -> Result<SyncService, AppError> {
    let aggregator = state
        .aggregator
        .clone()
        .ok_or_else(|| AppError::unavailable("Aggregator backend not configured"))?;
    Ok(SyncService::new(state.db.clone(), aggregator))
}

/// Build a revocation manager, or fail with 503 when no aggregator is
/// configured
fn revocation_manager(state: &AppState) -> Result<RevocationManager, AppError> {
    let aggregator = state
        .aggregator
        .clone()
        .ok_or_else(|| AppError::unavailable("Aggregator backend not configured"))?;
    Ok(RevocationManager::new(state.db.clone(), aggregator))
}
