//! Background scheduler for periodic account refreshes
//!
//! Provides optional scheduled sync functionality that can be enabled via
//! environment variables:
//!
//! - `GLIDEPATH_SYNC_SCHEDULE`: Interval in hours (e.g., "6" for four runs
//!   a day, "24" for daily)
//!
//! The scheduler runs in the background and refreshes accounts and
//! transactions for every user with at least one connected item. One user's
//! failure never stops the loop.

use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use glidepath_core::aggregator::Aggregator;
use glidepath_core::db::Database;
use glidepath_core::sync::SyncService;

/// Configuration for scheduled syncs
#[derive(Debug, Clone)]
pub struct SyncScheduleConfig {
    /// Interval between refreshes in hours
    pub interval_hours: u64,
}

impl SyncScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is not configured (GLIDEPATH_SYNC_SCHEDULE
    /// not set)
    pub fn from_env() -> Option<Self> {
        let interval_hours: u64 = std::env::var("GLIDEPATH_SYNC_SCHEDULE")
            .ok()
            .and_then(|s| s.parse().ok())?;

        if interval_hours == 0 {
            warn!("GLIDEPATH_SYNC_SCHEDULE is 0, scheduled sync disabled");
            return None;
        }

        Some(Self { interval_hours })
    }
}

/// Start the sync scheduler as a background task
///
/// This function spawns a tokio task that runs indefinitely, refreshing
/// every synced user at the configured interval.
pub fn start_sync_scheduler(db: Database, aggregator: Aggregator, config: SyncScheduleConfig) {
    info!(
        "Starting sync scheduler: every {} hours",
        config.interval_hours
    );

    tokio::spawn(async move {
        let service = SyncService::new(db.clone(), aggregator);
        let mut ticker = interval(Duration::from_secs(config.interval_hours * 3600));

        // Skip the first immediate tick - we don't want to sync on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            info!("Running scheduled sync...");
            run_scheduled_sync(&db, &service).await;
        }
    });
}

/// Refresh every user with connected items, sequentially
async fn run_scheduled_sync(db: &Database, service: &SyncService) {
    let users = match db.list_synced_user_ids() {
        Ok(users) => users,
        Err(e) => {
            warn!(error = %e, "Scheduled sync could not list users");
            return;
        }
    };

    for user_id in &users {
        match service.sync_accounts(user_id).await {
            Ok(outcome) => {
                if !outcome.errors.is_empty() {
                    warn!(
                        user = %user_id,
                        synced = outcome.total_synced,
                        failed_items = outcome.errors.len(),
                        "Scheduled account sync partially failed"
                    );
                }
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "Scheduled account sync failed");
                continue;
            }
        }

        let (start, end) = SyncService::default_window();
        match service.sync_transactions(user_id, start, end).await {
            Ok(outcome) => {
                info!(
                    user = %user_id,
                    transactions = outcome.total_synced,
                    failed_items = outcome.errors.len(),
                    "Scheduled sync complete"
                );
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "Scheduled transaction sync failed");
            }
        }
    }

    info!(users = users.len(), "Scheduled sync pass finished");
}
