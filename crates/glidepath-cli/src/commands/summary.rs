//! Summary command implementation

use anyhow::Result;
use chrono::{Duration, Utc};

use glidepath_core::db::Database;

pub fn cmd_summary(db: &Database, user: &str, days: i64) -> Result<()> {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(days);

    let summary = db.category_summary(user, start, end)?;

    println!();
    println!("💰 Spending Summary ({} → {})", start, end);
    println!("   ─────────────────────────────────────────────");
    println!("   Total spent:     ${:.2}", summary.total_spent);
    println!("   Total income:    ${:.2}", summary.total_income);
    println!("   Net cash flow:   ${:.2}", summary.net_cash_flow);
    println!("   Monthly average: ${:.2}", summary.monthly_average);

    if summary.by_category.is_empty() {
        println!();
        println!("   No settled spending in this window.");
        return Ok(());
    }

    println!();
    println!("   By category:");
    for entry in &summary.by_category {
        println!(
            "   {:<28} ${:>10.2}  ({} transactions)",
            entry.category, entry.amount, entry.count
        );
    }
    println!();

    Ok(())
}
