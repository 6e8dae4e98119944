//! Spending summaries over the transaction ledger

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{round_cents, CategorySummary, CategoryTotal};

/// Primary categories that represent money movement rather than real spend.
/// Excluded from both spend and income totals.
const EXCLUDED_CATEGORIES: &[&str] = &["Transfer", "Payment", "Credit Card Payment"];

impl Database {
    /// Compute a category spending summary over a date range
    ///
    /// Pending transactions are excluded entirely; counting them would
    /// double-spend once the settled row arrives under the same external id.
    /// Transfer-like categories are excluded from both totals. Rounding to
    /// cents happens once at the end, not per row.
    pub fn category_summary(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CategorySummary> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT amount, category_primary
            FROM transactions
            WHERE user_id = ?
              AND pending = 0
              AND date BETWEEN ? AND ?
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![user_id, from.to_string(), to.to_string()],
                |row| Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut total_spent = 0.0;
        let mut total_income = 0.0;
        let mut by_category: Vec<CategoryTotal> = Vec::new();

        for (amount, category) in rows {
            if EXCLUDED_CATEGORIES.contains(&category.as_str()) {
                continue;
            }

            if amount < 0.0 {
                total_spent += amount.abs();

                match by_category.iter_mut().find(|c| c.category == category) {
                    Some(entry) => {
                        entry.amount += amount.abs();
                        entry.count += 1;
                    }
                    None => by_category.push(CategoryTotal {
                        category,
                        amount: amount.abs(),
                        count: 1,
                    }),
                }
            } else if amount > 0.0 {
                total_income += amount;
            }
        }

        by_category.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for entry in &mut by_category {
            entry.amount = round_cents(entry.amount);
        }

        Ok(CategorySummary {
            total_spent: round_cents(total_spent),
            total_income: round_cents(total_income),
            net_cash_flow: round_cents(total_income - total_spent),
            // Trailing-90-day window spans roughly three months
            monthly_average: round_cents(total_spent / 3.0),
            by_category,
        })
    }
}
