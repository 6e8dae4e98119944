//! Sync orchestrator
//!
//! Drives a refresh for one user: iterates every connected item, calls the
//! aggregator, and merges the results into the account mirror, balance
//! history, and transaction ledger. Items fail independently; one
//! institution's outage never aborts the batch. The caller inspects the
//! returned error list to detect partial failure.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::aggregator::{credential_fingerprint, Aggregator, ExternalTransaction};
use crate::db::{AccountUpsert, Database};
use crate::error::Result;
use crate::models::{
    Item, ItemSyncError, ObservedTransaction, SyncOutcome, TransactionSyncOutcome,
};

/// Default scanning window for transaction refreshes
pub const DEFAULT_SYNC_DAYS: i64 = 90;

/// Orchestrates account and transaction refreshes against the aggregator
#[derive(Clone)]
pub struct SyncService {
    db: Database,
    aggregator: Aggregator,
}

impl SyncService {
    pub fn new(db: Database, aggregator: Aggregator) -> Self {
        Self { db, aggregator }
    }

    /// The trailing window used when a caller does not specify one
    pub fn default_window() -> (NaiveDate, NaiveDate) {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(DEFAULT_SYNC_DAYS);
        (start, end)
    }

    /// Refresh account balances for every connected item of one user
    ///
    /// Returns the number of accounts merged and the per-item failures.
    /// A user with zero items gets a successful empty outcome.
    pub async fn sync_accounts(&self, user_id: &str) -> Result<SyncOutcome> {
        let items = self.db.list_connected_items(user_id)?;

        let mut total_synced = 0;
        let mut errors = Vec::new();

        for item in &items {
            match self.sync_item_accounts(user_id, item).await {
                Ok(count) => total_synced += count,
                Err(e) => {
                    warn!(
                        item_id = item.id,
                        credential = %credential_fingerprint(&item.access_credential),
                        error = %e,
                        "Account sync failed for item"
                    );
                    errors.push(ItemSyncError {
                        item_id: item.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            user = user_id,
            synced = total_synced,
            failed_items = errors.len(),
            "Account sync complete"
        );

        Ok(SyncOutcome {
            total_synced,
            errors,
        })
    }

    /// Refresh one item's accounts: mirror merge first, then one balance
    /// history sample per account with the post-merge value
    async fn sync_item_accounts(&self, user_id: &str, item: &Item) -> Result<i64> {
        let accounts = self
            .aggregator
            .list_accounts(&item.access_credential)
            .await?;

        let mut count = 0;
        for ext in &accounts {
            let account_id = self.db.upsert_account(
                user_id,
                item.id,
                &AccountUpsert {
                    external_account_id: &ext.account_id,
                    name: &ext.name,
                    kind: ext.kind.parse().unwrap_or(crate::models::AccountKind::Other),
                    subtype: ext.subtype.as_deref(),
                    current_balance: ext.balances.current.unwrap_or_default(),
                    available_balance: ext.balances.available,
                },
            )?;

            // No sample when the institution reported no current balance
            if let Some(balance) = ext.balances.current {
                self.db.append_balance_sample(account_id, balance)?;
            }

            count += 1;
        }

        Ok(count)
    }

    /// Refresh transactions for every connected item of one user
    ///
    /// Same per-item isolation as `sync_accounts`. Each item's run ends by
    /// overwriting its sync-status row with this run's window and count.
    pub async fn sync_transactions(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TransactionSyncOutcome> {
        let items = self.db.list_connected_items(user_id)?;

        let mut total_synced = 0;
        let mut errors = Vec::new();

        for item in &items {
            match self
                .sync_item_transactions(user_id, item, start_date, end_date)
                .await
            {
                Ok(count) => total_synced += count,
                Err(e) => {
                    warn!(
                        item_id = item.id,
                        credential = %credential_fingerprint(&item.access_credential),
                        error = %e,
                        "Transaction sync failed for item"
                    );
                    errors.push(ItemSyncError {
                        item_id: item.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            user = user_id,
            synced = total_synced,
            failed_items = errors.len(),
            "Transaction sync complete"
        );

        Ok(TransactionSyncOutcome {
            total_synced,
            start_date,
            end_date,
            errors,
        })
    }

    async fn sync_item_transactions(
        &self,
        user_id: &str,
        item: &Item,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<i64> {
        let transactions = self
            .aggregator
            .list_transactions(&item.access_credential, start_date, end_date)
            .await?;

        let account_map = self.db.account_map(item.id)?;

        let mut merged = 0;
        let mut skipped = 0;
        for ext in &transactions {
            // Transactions for accounts we haven't mirrored yet are skipped,
            // not failed; the next run's overlapping window picks them up
            // once the account exists.
            let Some(observed) = normalize_transaction(ext, &account_map) else {
                skipped += 1;
                continue;
            };

            self.db.upsert_transaction(user_id, &observed)?;
            merged += 1;
        }

        if skipped > 0 {
            debug!(
                item_id = item.id,
                skipped, "Skipped transactions with no local account"
            );
        }

        self.db
            .upsert_sync_status(user_id, item.id, start_date, end_date, merged)?;

        Ok(merged)
    }
}

/// Normalize an external transaction into local conventions
///
/// Returns None when the external account id has no local mirror row.
/// The aggregator reports outflows as positive amounts; locally outflows
/// are negative.
fn normalize_transaction(
    ext: &ExternalTransaction,
    account_map: &std::collections::HashMap<String, i64>,
) -> Option<ObservedTransaction> {
    let account_id = *account_map.get(&ext.account_id)?;

    let categories = ext.category.as_deref().unwrap_or_default();
    let category_primary = categories
        .first()
        .cloned()
        .unwrap_or_else(|| "Other".to_string());
    let category_detailed = if categories.len() > 1 {
        categories.join(" > ")
    } else {
        category_primary.clone()
    };

    let merchant = ext
        .merchant_name
        .as_deref()
        .filter(|m| !m.is_empty())
        .or(Some(ext.name.as_str()))
        .filter(|m| !m.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    Some(ObservedTransaction {
        account_id,
        external_transaction_id: ext.transaction_id.clone(),
        date: ext.date,
        amount: -ext.amount,
        merchant,
        category_primary,
        category_detailed,
        pending: ext.pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{ExternalAccount, ExternalBalances, MockBackend};

    fn test_account(id: &str, name: &str, current: Option<f64>) -> ExternalAccount {
        ExternalAccount {
            account_id: id.to_string(),
            name: name.to_string(),
            kind: "depository".to_string(),
            subtype: Some("checking".to_string()),
            balances: ExternalBalances {
                current,
                available: current,
            },
        }
    }

    fn test_transaction(id: &str, account: &str, amount: f64, pending: bool) -> ExternalTransaction {
        ExternalTransaction {
            transaction_id: id.to_string(),
            account_id: account.to_string(),
            date: Utc::now().date_naive() - Duration::days(3),
            amount,
            name: "COFFEE SHOP 123".to_string(),
            merchant_name: Some("Coffee Shop".to_string()),
            category: Some(vec!["Food and Drink".to_string(), "Coffee".to_string()]),
            pending,
        }
    }

    fn setup() -> (Database, MockBackend, SyncService) {
        let db = Database::in_memory().unwrap();
        let mock = MockBackend::new();
        let service = SyncService::new(db.clone(), Aggregator::Mock(mock.clone()));
        (db, mock, service)
    }

    #[tokio::test]
    async fn test_sync_accounts_no_items() {
        let (_db, _mock, service) = setup();

        let outcome = service.sync_accounts("user-1").await.unwrap();
        assert_eq!(outcome.total_synced, 0);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_sync_accounts_merges_and_samples() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-1", Some("First Bank"), None)
            .unwrap();
        mock.set_accounts(
            "cred-1",
            vec![
                test_account("acc-1", "Checking", Some(1200.50)),
                test_account("acc-2", "Savings", None),
            ],
        );

        let outcome = service.sync_accounts("user-1").await.unwrap();
        assert_eq!(outcome.total_synced, 2);
        assert!(outcome.errors.is_empty());

        let accounts = db.list_accounts("user-1").unwrap();
        assert_eq!(accounts.len(), 2);

        // Only the account with a reported balance gets a history sample
        let checking = accounts
            .iter()
            .find(|a| a.external_account_id == "acc-1")
            .unwrap();
        let savings = accounts
            .iter()
            .find(|a| a.external_account_id == "acc-2")
            .unwrap();
        assert_eq!(
            db.list_balance_history("user-1", checking.id, 10)
                .unwrap()
                .len(),
            1
        );
        assert!(db
            .list_balance_history("user-1", savings.id, 10)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_sync_accounts_upsert_is_idempotent() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-1", None, None)
            .unwrap();
        mock.set_accounts("cred-1", vec![test_account("acc-1", "Checking", Some(100.0))]);

        service.sync_accounts("user-1").await.unwrap();
        mock.set_accounts("cred-1", vec![test_account("acc-1", "Checking", Some(250.0))]);
        service.sync_accounts("user-1").await.unwrap();

        let accounts = db.list_accounts("user-1").unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].current_balance, 250.0);

        // But history is append-only: two syncs, two samples
        let history = db
            .list_balance_history("user-1", accounts[0].id, 10)
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].balance, 250.0);
    }

    #[tokio::test]
    async fn test_sync_accounts_partial_failure_isolation() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-ok", None, None)
            .unwrap();
        let failing = db
            .register_item("user-1", "ext-item-2", "cred-bad", None, None)
            .unwrap();
        db.register_item("user-1", "ext-item-3", "cred-ok-2", None, None)
            .unwrap();

        mock.set_accounts("cred-ok", vec![test_account("acc-1", "Checking", Some(10.0))]);
        mock.set_accounts("cred-ok-2", vec![test_account("acc-2", "Savings", Some(20.0))]);
        mock.fail_credential("cred-bad");

        let outcome = service.sync_accounts("user-1").await.unwrap();

        // The two healthy items synced; exactly one error referencing the
        // failed item
        assert_eq!(outcome.total_synced, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].item_id, failing.id);
    }

    #[tokio::test]
    async fn test_sync_transactions_sign_and_categories() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-1", None, None)
            .unwrap();
        mock.set_accounts("cred-1", vec![test_account("acc-1", "Checking", Some(100.0))]);
        service.sync_accounts("user-1").await.unwrap();

        // Aggregator-positive outflow of 42.50
        mock.set_transactions("cred-1", vec![test_transaction("t1", "acc-1", 42.50, false)]);
        let (start, end) = SyncService::default_window();
        let outcome = service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();
        assert_eq!(outcome.total_synced, 1);

        let tx = db
            .get_transaction_by_external_id("t1")
            .unwrap()
            .expect("transaction merged");
        assert_eq!(tx.amount, -42.50);
        assert_eq!(tx.merchant, "Coffee Shop");
        assert_eq!(tx.category_primary, "Food and Drink");
        assert_eq!(tx.category_detailed, "Food and Drink > Coffee");
    }

    #[tokio::test]
    async fn test_sync_transactions_merge_is_idempotent() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-1", None, None)
            .unwrap();
        mock.set_accounts("cred-1", vec![test_account("acc-1", "Checking", Some(100.0))]);
        service.sync_accounts("user-1").await.unwrap();

        mock.set_transactions("cred-1", vec![test_transaction("t1", "acc-1", 10.0, true)]);
        let (start, end) = SyncService::default_window();
        service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();

        // Same external id reappears settled; the row updates in place
        mock.set_transactions("cred-1", vec![test_transaction("t1", "acc-1", 10.0, false)]);
        service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();

        let transactions = db.list_recent_transactions("user-1", 10).unwrap();
        assert_eq!(transactions.len(), 1);
        assert!(!transactions[0].pending);
        assert_eq!(transactions[0].amount, -10.0);
    }

    #[tokio::test]
    async fn test_sync_transactions_skips_unknown_accounts() {
        let (db, mock, service) = setup();

        db.register_item("user-1", "ext-item-1", "cred-1", None, None)
            .unwrap();
        // Transactions arrive before any account sync has run
        mock.set_transactions("cred-1", vec![test_transaction("t1", "acc-unknown", 5.0, false)]);

        let (start, end) = SyncService::default_window();
        let outcome = service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();

        // Skipped, not failed
        assert_eq!(outcome.total_synced, 0);
        assert!(outcome.errors.is_empty());
        assert!(db.list_recent_transactions("user-1", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_status_overwritten_per_run() {
        let (db, mock, service) = setup();

        let item = db
            .register_item("user-1", "ext-item-1", "cred-1", None, None)
            .unwrap();
        mock.set_accounts("cred-1", vec![test_account("acc-1", "Checking", Some(100.0))]);
        service.sync_accounts("user-1").await.unwrap();

        let (start, end) = SyncService::default_window();
        mock.set_transactions(
            "cred-1",
            vec![
                test_transaction("t1", "acc-1", 5.0, false),
                test_transaction("t2", "acc-1", 7.0, false),
            ],
        );
        service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();

        let status = db.get_sync_status("user-1", item.id).unwrap().unwrap();
        assert_eq!(status.transaction_count, 2);

        // A second run with fewer rows overwrites, never accumulates
        mock.set_transactions("cred-1", vec![test_transaction("t1", "acc-1", 5.0, false)]);
        service
            .sync_transactions("user-1", start, end)
            .await
            .unwrap();

        let status = db.get_sync_status("user-1", item.id).unwrap().unwrap();
        assert_eq!(status.transaction_count, 1);
    }

    #[test]
    fn test_normalize_single_element_category() {
        let mut ext = test_transaction("t1", "acc-1", 12.0, false);
        ext.category = Some(vec!["Travel".to_string()]);
        let mut map = std::collections::HashMap::new();
        map.insert("acc-1".to_string(), 7_i64);

        let observed = normalize_transaction(&ext, &map).unwrap();
        assert_eq!(observed.category_primary, "Travel");
        assert_eq!(observed.category_detailed, "Travel");
    }

    #[test]
    fn test_normalize_missing_category_and_merchant() {
        let mut ext = test_transaction("t1", "acc-1", 12.0, false);
        ext.category = None;
        ext.merchant_name = None;
        ext.name = String::new();
        let mut map = std::collections::HashMap::new();
        map.insert("acc-1".to_string(), 7_i64);

        let observed = normalize_transaction(&ext, &map).unwrap();
        assert_eq!(observed.category_primary, "Other");
        assert_eq!(observed.merchant, "Unknown");
    }
}
