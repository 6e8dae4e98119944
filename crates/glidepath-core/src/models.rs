//! Domain models for Glidepath

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A linked institution connection ("item")
///
/// One item per completed link flow. The access credential is write-once and
/// is read only by the sync orchestrator and the revocation manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub user_id: String,
    /// Stable identifier assigned by the aggregator
    pub external_item_id: String,
    /// Opaque access credential for aggregator calls. Never serialized
    /// into API responses.
    #[serde(skip_serializing)]
    pub access_credential: String,
    pub institution_name: Option<String>,
    pub institution_id: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

/// Item lifecycle status
///
/// Revocation is terminal: a revoked item's credential must never be used
/// for a subsequent sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Connected,
    Revoking,
    Revoked,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Revoking => "revoking",
            Self::Revoked => "revoked",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connected" => Ok(Self::Connected),
            "revoking" => Ok(Self::Revoking),
            "revoked" => Ok(Self::Revoked),
            _ => Err(format!("Unknown item status: {}", s)),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account classification, following the aggregator's top-level types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Depository,
    Investment,
    Credit,
    Loan,
    Other,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Investment => "investment",
            Self::Credit => "credit",
            Self::Loan => "loan",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "depository" => Ok(Self::Depository),
            "investment" | "brokerage" => Ok(Self::Investment),
            "credit" => Ok(Self::Credit),
            "loan" => Ok(Self::Loan),
            _ => Ok(Self::Other),
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A mirrored financial account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    /// The item this account belongs to; account lifetime is bounded by
    /// item lifetime
    pub item_id: i64,
    /// Stable identifier assigned by the aggregator, unique across the store
    pub external_account_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub subtype: Option<String>,
    pub current_balance: f64,
    pub available_balance: Option<f64>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One balance observation, appended per account per successful sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSample {
    pub id: i64,
    pub account_id: i64,
    pub balance: f64,
    pub sampled_at: DateTime<Utc>,
}

/// A mirrored transaction
///
/// Negative amount = outflow, positive = inflow. Keyed by the aggregator's
/// stable transaction id; re-delivery of the same id updates the row in
/// place (pending rows commonly finalize into settled ones).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub external_transaction_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub merchant: String,
    pub category_primary: String,
    pub category_detailed: String,
    pub pending: bool,
    pub created_at: DateTime<Utc>,
}

/// A transaction as observed from the aggregator, normalized to local
/// conventions and ready to merge
#[derive(Debug, Clone)]
pub struct ObservedTransaction {
    pub account_id: i64,
    pub external_transaction_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub merchant: String,
    pub category_primary: String,
    pub category_detailed: String,
    pub pending: bool,
}

/// Last-sync record for a (user, item) pair; overwritten each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub user_id: String,
    pub item_id: i64,
    pub last_synced_at: DateTime<Utc>,
    pub sync_start_date: NaiveDate,
    pub sync_end_date: NaiveDate,
    pub transaction_count: i64,
}

/// One failed item within an otherwise successful sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSyncError {
    pub item_id: i64,
    pub error: String,
}

/// Result of an account refresh across all of a user's items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Accounts merged across all items that succeeded
    pub total_synced: i64,
    pub errors: Vec<ItemSyncError>,
}

/// Result of a transaction refresh across all of a user's items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSyncOutcome {
    /// Transactions merged across all items that succeeded
    pub total_synced: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub errors: Vec<ItemSyncError>,
}

/// Outcome of disconnecting a single item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectOutcome {
    pub item_id: i64,
    /// False when the external revocation call failed; local deletion
    /// proceeds regardless
    pub credential_revoked: bool,
}

/// Outcome of a full user-data deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub items_removed: i64,
    /// How many external credentials were actually revoked; callers surface
    /// a partial-success message when this is lower than items_removed
    pub credentials_revoked: i64,
}

/// Spending rollup for one primary category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
    pub count: i64,
}

/// Derived spending summary over a date range; never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total_spent: f64,
    pub total_income: f64,
    pub net_cash_flow: f64,
    /// Trailing-window convention: total spend divided by three months
    pub monthly_average: f64,
    /// Sorted descending by amount
    pub by_category: Vec<CategoryTotal>,
}

/// Round to cent precision. Applied once at the end of aggregation so
/// intermediate sums don't compound rounding error.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
