//! Glidepath Core Library
//!
//! Shared functionality for the Glidepath account-sync service:
//! - Database access and migrations (SQLCipher-encrypted credential vault)
//! - Pluggable aggregator backends (Plaid-shaped HTTP, mock)
//! - Sync orchestrator for account and transaction refreshes
//! - Category spending summaries over the transaction ledger
//! - Revocation manager for disconnects and full account deletion

pub mod aggregator;
pub mod db;
pub mod error;
pub mod models;
pub mod revoke;
pub mod sync;

pub use aggregator::{
    credential_fingerprint, Aggregator, AggregatorBackend, ExternalAccount, ExternalBalances,
    ExternalTransaction, MockBackend, PlaidBackend,
};
pub use db::{AccountUpsert, Database};
pub use error::{Error, Result};
pub use models::{
    Account, AccountKind, BalanceSample, CategorySummary, CategoryTotal, DeleteOutcome,
    DisconnectOutcome, Item, ItemStatus, ItemSyncError, ObservedTransaction, SyncOutcome,
    SyncStatus, Transaction, TransactionSyncOutcome,
};
pub use revoke::RevocationManager;
pub use sync::{SyncService, DEFAULT_SYNC_DAYS};
