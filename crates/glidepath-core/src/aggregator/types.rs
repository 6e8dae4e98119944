//! Wire types shared by aggregator backends
//!
//! These mirror the shapes the aggregation service returns. Field names
//! follow the external API; the sync orchestrator normalizes them into
//! local conventions (sign flip, category derivation) before persisting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Balances as reported by the aggregator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalBalances {
    /// Current balance; absent for some account types mid-refresh
    pub current: Option<f64>,
    pub available: Option<f64>,
}

/// An account as reported by the aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub account_id: String,
    pub name: String,
    /// Top-level type string (depository, investment, credit, loan, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub balances: ExternalBalances,
}

/// A transaction as reported by the aggregator
///
/// The external sign convention is inverted from ours: positive amounts are
/// outflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    /// Raw description from the institution
    pub name: String,
    /// Cleaned-up merchant name, when the aggregator has one
    pub merchant_name: Option<String>,
    /// Category path, most general first (e.g. ["Food and Drink", "Restaurants"])
    pub category: Option<Vec<String>>,
    pub pending: bool,
}
