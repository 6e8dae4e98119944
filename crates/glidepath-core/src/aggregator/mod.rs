//! Pluggable account-aggregator client abstraction
//!
//! This module provides a backend-agnostic interface to the external
//! account-aggregation service.
//!
//! # Architecture
//!
//! - `AggregatorBackend` trait: defines the interface for all aggregator operations
//! - `Aggregator` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `PlaidBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `GLIDEPATH_AGGREGATOR`: Backend to use (plaid, mock). Default: plaid
//! - `GLIDEPATH_PLAID_HOST`: Aggregator API base URL (required for plaid backend)
//! - `GLIDEPATH_PLAID_CLIENT_ID`: API client id (required for plaid backend)
//! - `GLIDEPATH_PLAID_SECRET`: API secret (required for plaid backend)

mod mock;
mod plaid;
mod types;

pub use mock::MockBackend;
pub use plaid::PlaidBackend;
pub use types::{ExternalAccount, ExternalBalances, ExternalTransaction};

use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Short SHA-256 fingerprint of an access credential, for log lines
///
/// Credentials must never appear in logs; the fingerprint is enough to
/// correlate entries for the same connection.
pub fn credential_fingerprint(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    hex::encode(&digest[..4])
}

/// Trait defining the interface for all aggregator backends
///
/// Every call can fail with a transport or rejection error; callers treat
/// any failure uniformly as "this item failed this run."
#[async_trait]
pub trait AggregatorBackend: Send + Sync {
    /// Fetch current accounts and balances for one credential
    async fn list_accounts(&self, credential: &str) -> Result<Vec<ExternalAccount>>;

    /// Fetch transactions for one credential in [start, end]
    async fn list_transactions(
        &self,
        credential: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>>;

    /// Invalidate a credential with the aggregator
    async fn revoke_credential(&self, credential: &str) -> Result<()>;

    /// Check if the aggregator is reachable
    async fn health_check(&self) -> bool;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete aggregator client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum Aggregator {
    /// Plaid-shaped HTTP backend
    Plaid(PlaidBackend),
    /// Mock backend for tests and development
    Mock(MockBackend),
}

impl Aggregator {
    /// Create from environment variables
    ///
    /// Returns None when no backend is configured; a sync trigger without a
    /// configured aggregator is a fatal configuration error, not a per-item
    /// failure.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("GLIDEPATH_AGGREGATOR").unwrap_or_else(|_| "plaid".to_string());
        match backend.as_str() {
            "mock" => Some(Self::Mock(MockBackend::new())),
            _ => PlaidBackend::from_env().map(Self::Plaid),
        }
    }

    pub async fn list_accounts(&self, credential: &str) -> Result<Vec<ExternalAccount>> {
        match self {
            Self::Plaid(b) => b.list_accounts(credential).await,
            Self::Mock(b) => b.list_accounts(credential).await,
        }
    }

    pub async fn list_transactions(
        &self,
        credential: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>> {
        match self {
            Self::Plaid(b) => b.list_transactions(credential, start_date, end_date).await,
            Self::Mock(b) => b.list_transactions(credential, start_date, end_date).await,
        }
    }

    pub async fn revoke_credential(&self, credential: &str) -> Result<()> {
        match self {
            Self::Plaid(b) => b.revoke_credential(credential).await,
            Self::Mock(b) => b.revoke_credential(credential).await,
        }
    }

    pub async fn health_check(&self) -> bool {
        match self {
            Self::Plaid(b) => b.health_check().await,
            Self::Mock(b) => b.health_check().await,
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Plaid(b) => b.host(),
            Self::Mock(b) => b.host(),
        }
    }
}
