//! Shared command utilities

use std::path::Path;

use anyhow::{Context, Result};
use glidepath_core::aggregator::Aggregator;
use glidepath_core::db::Database;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_str().unwrap();
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Build the aggregator client from environment variables
///
/// A missing aggregator is fatal for sync commands: no per-item work can
/// proceed without it.
pub fn aggregator_from_env() -> Result<Aggregator> {
    Aggregator::from_env().context(
        "Aggregator not configured. Set GLIDEPATH_PLAID_HOST, GLIDEPATH_PLAID_CLIENT_ID \
         and GLIDEPATH_PLAID_SECRET, or GLIDEPATH_AGGREGATOR=mock for development.",
    )
}
