//! CLI command tests

use chrono::{Duration, Utc};
use clap::Parser;

use glidepath_core::aggregator::{
    Aggregator, ExternalAccount, ExternalBalances, ExternalTransaction, MockBackend,
};
use glidepath_core::db::Database;
use glidepath_core::models::ObservedTransaction;

use crate::cli::{Cli, Commands};
use crate::commands;

fn seed_db() -> (Database, MockBackend) {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::new();

    db.register_item("user-1", "ext-item-1", "cred-1", Some("First Bank"), None)
        .unwrap();
    mock.set_accounts(
        "cred-1",
        vec![ExternalAccount {
            account_id: "acc-1".to_string(),
            name: "Checking".to_string(),
            kind: "depository".to_string(),
            subtype: None,
            balances: ExternalBalances {
                current: Some(1_000.0),
                available: Some(950.0),
            },
        }],
    );
    mock.set_transactions(
        "cred-1",
        vec![ExternalTransaction {
            transaction_id: "t1".to_string(),
            account_id: "acc-1".to_string(),
            date: Utc::now().date_naive() - Duration::days(2),
            amount: 25.0,
            name: "GROCERY STORE".to_string(),
            merchant_name: Some("Grocery Store".to_string()),
            category: Some(vec!["Groceries".to_string()]),
            pending: false,
        }],
    );

    (db, mock)
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_sync_command() {
    let cli = Cli::try_parse_from(["glidepath", "sync", "--user", "user-1", "--accounts"]).unwrap();
    match cli.command {
        Commands::Sync {
            user,
            accounts,
            transactions,
        } => {
            assert_eq!(user, "user-1");
            assert!(accounts);
            assert!(!transactions);
        }
        _ => panic!("Expected sync command"),
    }
}

#[test]
fn test_parse_summary_defaults() {
    let cli = Cli::try_parse_from(["glidepath", "summary", "--user", "user-1"]).unwrap();
    match cli.command {
        Commands::Summary { user, days } => {
            assert_eq!(user, "user-1");
            assert_eq!(days, 90);
        }
        _ => panic!("Expected summary command"),
    }
}

#[test]
fn test_sync_requires_user() {
    assert!(Cli::try_parse_from(["glidepath", "sync"]).is_err());
}

// ========== Command Tests ==========

#[tokio::test]
async fn test_cmd_sync_full_refresh() {
    let (db, mock) = seed_db();

    commands::cmd_sync(&db, Aggregator::Mock(mock), "user-1", false, false)
        .await
        .unwrap();

    let accounts = db.list_accounts("user-1").unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].current_balance, 1_000.0);

    let transactions = db.list_recent_transactions("user-1", 10).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, -25.0);
}

#[tokio::test]
async fn test_cmd_sync_accounts_only() {
    let (db, mock) = seed_db();

    commands::cmd_sync(&db, Aggregator::Mock(mock), "user-1", true, false)
        .await
        .unwrap();

    assert_eq!(db.list_accounts("user-1").unwrap().len(), 1);
    assert!(db.list_recent_transactions("user-1", 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_cmd_sync_no_items_is_ok() {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::new();

    commands::cmd_sync(&db, Aggregator::Mock(mock), "user-without-items", false, false)
        .await
        .unwrap();
}

#[test]
fn test_cmd_summary_runs_on_seeded_data() {
    let db = Database::in_memory().unwrap();
    let item = db
        .register_item("user-1", "ext-item-1", "cred-1", None, None)
        .unwrap();
    let account_id = db
        .upsert_account(
            "user-1",
            item.id,
            &glidepath_core::db::AccountUpsert {
                external_account_id: "acc-1",
                name: "Checking",
                kind: glidepath_core::models::AccountKind::Depository,
                subtype: None,
                current_balance: 100.0,
                available_balance: None,
            },
        )
        .unwrap();
    db.upsert_transaction(
        "user-1",
        &ObservedTransaction {
            account_id,
            external_transaction_id: "t1".to_string(),
            date: Utc::now().date_naive() - Duration::days(1),
            amount: -42.5,
            merchant: "Coffee Shop".to_string(),
            category_primary: "Food and Drink".to_string(),
            category_detailed: "Food and Drink > Coffee".to_string(),
            pending: false,
        },
    )
    .unwrap();

    commands::cmd_summary(&db, "user-1", 90).unwrap();
}

#[test]
fn test_cmd_summary_empty_db() {
    let db = Database::in_memory().unwrap();
    commands::cmd_summary(&db, "user-1", 30).unwrap();
}

#[test]
fn test_cmd_status_uninitialized_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glidepath.db");

    commands::cmd_status(&path, "user-1", true).unwrap();
}
