//! Sync command implementation

use anyhow::Result;

use glidepath_core::aggregator::Aggregator;
use glidepath_core::db::Database;
use glidepath_core::models::ItemSyncError;
use glidepath_core::sync::SyncService;

fn print_item_errors(errors: &[ItemSyncError]) {
    for error in errors {
        println!("   ⚠️  Item {}: {}", error.item_id, error.error);
    }
}

pub async fn cmd_sync(
    db: &Database,
    aggregator: Aggregator,
    user: &str,
    accounts_only: bool,
    transactions_only: bool,
) -> Result<()> {
    let items = db.list_connected_items(user)?;
    if items.is_empty() {
        println!("No connected institutions for user '{}'.", user);
        return Ok(());
    }

    println!("🔄 Syncing {} institution(s) for {}...", items.len(), user);

    let service = SyncService::new(db.clone(), aggregator);

    if !transactions_only {
        let outcome = service.sync_accounts(user).await?;
        println!("   Accounts synced: {}", outcome.total_synced);
        print_item_errors(&outcome.errors);
    }

    if !accounts_only {
        let (start, end) = SyncService::default_window();
        let outcome = service.sync_transactions(user, start, end).await?;
        println!(
            "   Transactions synced: {} ({} → {})",
            outcome.total_synced, outcome.start_date, outcome.end_date
        );
        print_item_errors(&outcome.errors);
    }

    println!("✅ Sync complete.");
    Ok(())
}
