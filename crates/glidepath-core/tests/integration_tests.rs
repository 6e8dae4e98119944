//! Integration tests for glidepath-core
//!
//! These tests exercise the full link → sync → summarize → disconnect
//! workflow against the mock aggregator backend.

use chrono::{Duration, Utc};

use glidepath_core::{
    Aggregator, Database, ExternalAccount, ExternalBalances, ExternalTransaction, MockBackend,
    RevocationManager, SyncService,
};

fn external_account(id: &str, kind: &str, balance: f64) -> ExternalAccount {
    ExternalAccount {
        account_id: id.to_string(),
        name: format!("Account {}", id),
        kind: kind.to_string(),
        subtype: None,
        balances: ExternalBalances {
            current: Some(balance),
            available: Some(balance),
        },
    }
}

fn external_transaction(
    id: &str,
    account: &str,
    amount: f64,
    category: &str,
    pending: bool,
) -> ExternalTransaction {
    ExternalTransaction {
        transaction_id: id.to_string(),
        account_id: account.to_string(),
        date: Utc::now().date_naive() - Duration::days(5),
        amount,
        name: format!("RAW {}", id),
        merchant_name: Some("Merchant".to_string()),
        category: Some(vec![category.to_string()]),
        pending,
    }
}

fn setup() -> (Database, MockBackend, SyncService, RevocationManager) {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::new();
    let aggregator = Aggregator::Mock(mock.clone());
    let sync = SyncService::new(db.clone(), aggregator.clone());
    let revoke = RevocationManager::new(db.clone(), aggregator);
    (db, mock, sync, revoke)
}

#[tokio::test]
async fn test_full_sync_workflow() {
    let (db, mock, sync, _revoke) = setup();

    db.register_item("user-1", "ext-item-1", "cred-1", Some("First Bank"), None)
        .unwrap();
    mock.set_accounts(
        "cred-1",
        vec![
            external_account("acc-1", "depository", 2_500.0),
            external_account("acc-2", "investment", 80_000.0),
        ],
    );
    mock.set_transactions(
        "cred-1",
        vec![
            external_transaction("t1", "acc-1", 30.0, "Groceries", false),
            external_transaction("t2", "acc-1", 20.0, "Groceries", false),
            external_transaction("t3", "acc-1", 15.0, "Transfer", false),
            external_transaction("t4", "acc-1", -500.0, "Payroll", false),
        ],
    );

    let accounts = sync.sync_accounts("user-1").await.unwrap();
    assert_eq!(accounts.total_synced, 2);
    assert!(accounts.errors.is_empty());

    let (start, end) = SyncService::default_window();
    let transactions = sync.sync_transactions("user-1", start, end).await.unwrap();
    assert_eq!(transactions.total_synced, 4);
    assert!(transactions.errors.is_empty());

    // The mirror feeds the advice-engine balance inputs
    assert_eq!(db.total_cash_balance("user-1").unwrap(), 2_500.0);
    assert_eq!(db.total_investment_balance("user-1").unwrap(), 80_000.0);

    // Category rollup: 50 groceries spend, 500 income, transfer excluded
    let summary = db.category_summary("user-1", start, end).unwrap();
    assert_eq!(summary.total_spent, 50.0);
    assert_eq!(summary.total_income, 500.0);
    assert_eq!(summary.net_cash_flow, 450.0);
    assert_eq!(summary.by_category.len(), 1);
    assert_eq!(summary.by_category[0].category, "Groceries");
    assert_eq!(summary.by_category[0].count, 2);
}

#[tokio::test]
async fn test_resync_settles_pending_transaction_counted_once() {
    let (db, mock, sync, _revoke) = setup();

    db.register_item("user-1", "ext-item-1", "cred-1", None, None)
        .unwrap();
    mock.set_accounts("cred-1", vec![external_account("acc-1", "depository", 100.0)]);
    sync.sync_accounts("user-1").await.unwrap();

    let (start, end) = SyncService::default_window();

    // First sync observes the transaction pending
    mock.set_transactions(
        "cred-1",
        vec![external_transaction("t1", "acc-1", 10.0, "Groceries", true)],
    );
    sync.sync_transactions("user-1", start, end).await.unwrap();

    // Pending rows never count toward the summary
    let summary = db.category_summary("user-1", start, end).unwrap();
    assert_eq!(summary.total_spent, 0.0);

    // Second sync re-delivers it settled under the same external id
    mock.set_transactions(
        "cred-1",
        vec![external_transaction("t1", "acc-1", 10.0, "Groceries", false)],
    );
    sync.sync_transactions("user-1", start, end).await.unwrap();

    let transactions = db.list_recent_transactions("user-1", 10).unwrap();
    assert_eq!(transactions.len(), 1);
    assert!(!transactions[0].pending);
    assert_eq!(transactions[0].amount, -10.0);

    let summary = db.category_summary("user-1", start, end).unwrap();
    assert_eq!(summary.total_spent, 10.0);
    assert_eq!(summary.by_category[0].count, 1);
}

#[tokio::test]
async fn test_one_failing_institution_never_aborts_the_batch() {
    let (db, mock, sync, _revoke) = setup();

    db.register_item("user-1", "ext-item-1", "cred-1", None, None)
        .unwrap();
    let failing = db
        .register_item("user-1", "ext-item-2", "cred-2", None, None)
        .unwrap();
    db.register_item("user-1", "ext-item-3", "cred-3", None, None)
        .unwrap();

    mock.set_accounts("cred-1", vec![external_account("acc-1", "depository", 10.0)]);
    mock.set_accounts("cred-3", vec![external_account("acc-3", "depository", 30.0)]);
    mock.fail_credential("cred-2");

    let outcome = sync.sync_accounts("user-1").await.unwrap();
    assert_eq!(outcome.total_synced, 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].item_id, failing.id);

    // Transaction sync isolates the same way
    mock.set_transactions(
        "cred-1",
        vec![external_transaction("t1", "acc-1", 5.0, "Shops", false)],
    );
    let (start, end) = SyncService::default_window();
    let outcome = sync.sync_transactions("user-1", start, end).await.unwrap();
    assert_eq!(outcome.total_synced, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].item_id, failing.id);
}

#[tokio::test]
async fn test_disconnect_cascades_even_when_revocation_fails() {
    let (db, mock, sync, revoke) = setup();

    let item = db
        .register_item("user-1", "ext-item-1", "cred-1", None, None)
        .unwrap();
    mock.set_accounts("cred-1", vec![external_account("acc-1", "depository", 100.0)]);
    mock.set_transactions(
        "cred-1",
        vec![external_transaction("t1", "acc-1", 5.0, "Shops", false)],
    );
    sync.sync_accounts("user-1").await.unwrap();
    let (start, end) = SyncService::default_window();
    sync.sync_transactions("user-1", start, end).await.unwrap();

    mock.fail_revocation("cred-1");
    let outcome = revoke.disconnect_item("user-1", item.id).await.unwrap();
    assert!(!outcome.credential_revoked);

    // No account, transaction, or sync-status row referencing the item remains
    assert!(db.get_item("user-1", item.id).unwrap().is_none());
    assert!(db.list_accounts("user-1").unwrap().is_empty());
    assert!(db.list_recent_transactions("user-1", 10).unwrap().is_empty());
    assert!(db.get_sync_status("user-1", item.id).unwrap().is_none());
}

#[tokio::test]
async fn test_delete_all_user_data_reports_partial_revocation() {
    let (db, mock, sync, revoke) = setup();

    for (item, cred) in [("ext-item-1", "cred-1"), ("ext-item-2", "cred-2")] {
        db.register_item("user-1", item, cred, None, None).unwrap();
        mock.set_accounts(cred, vec![external_account(&format!("acc-{}", cred), "depository", 10.0)]);
    }
    sync.sync_accounts("user-1").await.unwrap();
    mock.fail_revocation("cred-2");

    let outcome = revoke.delete_all_user_data("user-1").await.unwrap();
    assert_eq!(outcome.items_removed, 2);
    assert_eq!(outcome.credentials_revoked, 1);

    assert!(db.list_items("user-1").unwrap().is_empty());
    assert!(db.list_accounts("user-1").unwrap().is_empty());
}

#[tokio::test]
async fn test_revoked_item_is_never_synced_again() {
    let (db, mock, sync, _revoke) = setup();

    let item = db
        .register_item("user-1", "ext-item-1", "cred-1", None, None)
        .unwrap();
    mock.set_accounts("cred-1", vec![external_account("acc-1", "depository", 10.0)]);
    db.set_item_status(item.id, glidepath_core::ItemStatus::Revoked)
        .unwrap();

    let outcome = sync.sync_accounts("user-1").await.unwrap();
    assert_eq!(outcome.total_synced, 0);
    assert!(outcome.errors.is_empty());
    assert!(db.list_accounts("user-1").unwrap().is_empty());
}
