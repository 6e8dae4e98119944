//! Status command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path, user: &str, no_encrypt: bool) -> Result<()> {
    use glidepath_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Glidepath Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    let db = open_db(db_path, no_encrypt)?;

    let items = db.list_items(user)?;
    if items.is_empty() {
        println!();
        println!("   No linked institutions for user '{}'.", user);
        return Ok(());
    }

    println!();
    println!("   Linked institutions for {}:", user);
    for item in &items {
        let institution = item.institution_name.as_deref().unwrap_or("(unknown)");
        println!("   • [{}] {} ({})", item.id, institution, item.status);

        match db.get_sync_status(user, item.id)? {
            Some(status) => {
                println!(
                    "       last synced {} UTC, {} transactions over {} → {}",
                    status.last_synced_at.format("%Y-%m-%d %H:%M"),
                    status.transaction_count,
                    status.sync_start_date,
                    status.sync_end_date
                );
            }
            None => println!("       never synced"),
        }
    }

    let accounts = db.list_accounts(user)?;
    println!();
    println!("   Accounts: {}", accounts.len());
    println!("   Cash balance: ${:.2}", db.total_cash_balance(user)?);
    println!(
        "   Investment balance: ${:.2}",
        db.total_investment_balance(user)?
    );
    println!();

    Ok(())
}
