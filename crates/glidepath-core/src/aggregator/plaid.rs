//! Plaid-shaped HTTP backend
//!
//! Talks to the aggregation service's REST API. Authentication is
//! client-id/secret in the request body, per the Plaid convention. Every
//! call carries its own timeout so a hung institution turns into a per-item
//! failure instead of stalling the whole batch.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{ExternalAccount, ExternalTransaction};
use super::AggregatorBackend;

/// Per-call timeout; a timed-out call is a per-item failure, never a fatal
/// abort of the batch
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for transaction fetches
const TRANSACTIONS_PAGE_SIZE: i64 = 500;

#[derive(Clone)]
pub struct PlaidBackend {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl PlaidBackend {
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("GLIDEPATH_PLAID_HOST").ok()?;
        let client_id = std::env::var("GLIDEPATH_PLAID_CLIENT_ID").ok()?;
        let secret = std::env::var("GLIDEPATH_PLAID_SECRET").ok()?;
        Some(Self::new(&host, &client_id, &secret))
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .timeout(CALL_TIMEOUT)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Aggregator(format!(
                "{} returned {}: {}",
                path, status, detail
            )));
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct BalanceRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct BalanceResponse {
    accounts: Vec<ExternalAccount>,
}

#[derive(Serialize)]
struct TransactionsRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    start_date: String,
    end_date: String,
    options: TransactionsOptions,
}

#[derive(Serialize)]
struct TransactionsOptions {
    count: i64,
    offset: i64,
}

#[derive(Deserialize)]
struct TransactionsResponse {
    transactions: Vec<ExternalTransaction>,
    total_transactions: i64,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct RemoveResponse {
    #[allow(dead_code)]
    #[serde(default)]
    removed: bool,
}

#[async_trait]
impl AggregatorBackend for PlaidBackend {
    async fn list_accounts(&self, credential: &str) -> Result<Vec<ExternalAccount>> {
        let request = BalanceRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token: credential,
        };

        let response: BalanceResponse = self.post_json("/accounts/balance/get", &request).await?;
        debug!(count = response.accounts.len(), "Fetched account balances");

        Ok(response.accounts)
    }

    async fn list_transactions(
        &self,
        credential: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>> {
        let mut transactions = Vec::new();

        // The API pages transaction results; keep fetching until the
        // reported total is reached
        loop {
            let request = TransactionsRequest {
                client_id: &self.client_id,
                secret: &self.secret,
                access_token: credential,
                start_date: start_date.to_string(),
                end_date: end_date.to_string(),
                options: TransactionsOptions {
                    count: TRANSACTIONS_PAGE_SIZE,
                    offset: transactions.len() as i64,
                },
            };

            let response: TransactionsResponse =
                self.post_json("/transactions/get", &request).await?;

            let page_len = response.transactions.len();
            transactions.extend(response.transactions);

            if page_len == 0 || transactions.len() as i64 >= response.total_transactions {
                break;
            }
        }

        debug!(count = transactions.len(), "Fetched transactions");
        Ok(transactions)
    }

    async fn revoke_credential(&self, credential: &str) -> Result<()> {
        let request = RemoveRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            access_token: credential,
        };

        let _: RemoveResponse = self.post_json("/item/remove", &request).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
