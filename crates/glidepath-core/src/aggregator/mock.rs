//! Mock backend for testing
//!
//! Provides per-credential fixtures and failure injection for all aggregator
//! operations. Useful for unit tests and development without the external
//! service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};

use super::types::{ExternalAccount, ExternalTransaction};
use super::AggregatorBackend;

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, Vec<ExternalAccount>>,
    transactions: HashMap<String, Vec<ExternalTransaction>>,
    /// Credentials whose list_* calls fail
    failing: HashSet<String>,
    /// Credentials whose revocation call fails
    failing_revocation: HashSet<String>,
    /// Credentials revoked so far
    revoked: Vec<String>,
}

/// Mock aggregator backend for testing
///
/// Fixtures are keyed by credential; clones share state so a test can keep
/// configuring the mock after handing a clone to the service under test.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accounts returned for a credential
    pub fn set_accounts(&self, credential: &str, accounts: Vec<ExternalAccount>) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(credential.to_string(), accounts);
    }

    /// Set the transactions returned for a credential
    ///
    /// `list_transactions` filters these by the requested date range.
    pub fn set_transactions(&self, credential: &str, transactions: Vec<ExternalTransaction>) {
        self.state
            .lock()
            .unwrap()
            .transactions
            .insert(credential.to_string(), transactions);
    }

    /// Make list_accounts/list_transactions fail for a credential
    pub fn fail_credential(&self, credential: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(credential.to_string());
    }

    /// Make revoke_credential fail for a credential
    pub fn fail_revocation(&self, credential: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_revocation
            .insert(credential.to_string());
    }

    /// Credentials revoked so far, in call order
    pub fn revoked(&self) -> Vec<String> {
        self.state.lock().unwrap().revoked.clone()
    }
}

#[async_trait]
impl AggregatorBackend for MockBackend {
    async fn list_accounts(&self, credential: &str) -> Result<Vec<ExternalAccount>> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(credential) {
            return Err(Error::Aggregator("institution unavailable".to_string()));
        }
        Ok(state.accounts.get(credential).cloned().unwrap_or_default())
    }

    async fn list_transactions(
        &self,
        credential: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(credential) {
            return Err(Error::Aggregator("institution unavailable".to_string()));
        }
        let transactions = state
            .transactions
            .get(credential)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|tx| tx.date >= start_date && tx.date <= end_date)
            .collect();
        Ok(transactions)
    }

    async fn revoke_credential(&self, credential: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_revocation.contains(credential) {
            return Err(Error::Aggregator("revocation rejected".to_string()));
        }
        state.revoked.push(credential.to_string());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn host(&self) -> &str {
        "mock"
    }
}
