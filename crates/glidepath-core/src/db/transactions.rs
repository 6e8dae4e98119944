//! Transaction ledger operations
//!
//! The ledger is a merge-upsert store keyed by the aggregator's stable
//! transaction id. Aggregators re-deliver records freely (at-least-once),
//! and pending transactions later finalize into settled ones under the same
//! id, so every write goes through a single insert-or-update statement.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ObservedTransaction, Transaction};

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(4)?;
    let created_at_str: String = row.get(10)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        external_transaction_id: row.get(3)?,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
        amount: row.get(5)?,
        merchant: row.get(6)?,
        category_primary: row.get(7)?,
        category_detailed: row.get(8)?,
        pending: row.get(9)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const TX_COLUMNS: &str = "id, user_id, account_id, external_transaction_id, date, amount, \
    merchant, category_primary, category_detailed, pending, created_at";

impl Database {
    /// Merge one observed transaction into the ledger
    ///
    /// Insert if the external id is unseen; otherwise update the mutable
    /// fields in place. Applying the same observation twice leaves exactly
    /// one row matching the most recent observation.
    pub fn upsert_transaction(&self, user_id: &str, tx: &ObservedTransaction) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, account_id, external_transaction_id, date, amount,
                                      merchant, category_primary, category_detailed, pending)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_transaction_id) DO UPDATE SET
                date = excluded.date,
                amount = excluded.amount,
                merchant = excluded.merchant,
                category_primary = excluded.category_primary,
                category_detailed = excluded.category_detailed,
                pending = excluded.pending
            "#,
            params![
                user_id,
                tx.account_id,
                tx.external_transaction_id,
                tx.date.to_string(),
                tx.amount,
                tx.merchant,
                tx.category_primary,
                tx.category_detailed,
                tx.pending,
            ],
        )?;

        Ok(())
    }

    /// Look up a transaction by its external id
    pub fn get_transaction_by_external_id(
        &self,
        external_transaction_id: &str,
    ) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE external_transaction_id = ?",
                    TX_COLUMNS
                ),
                params![external_transaction_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// List a user's most recent transactions
    pub fn list_recent_transactions(&self, user_id: &str, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = ?
            ORDER BY date DESC, id DESC
            LIMIT ?
            "#,
            TX_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, limit], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// List a user's transactions in a date range, newest first
    pub fn list_transactions_in_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = ? AND date BETWEEN ? AND ?
            ORDER BY date DESC, id DESC
            "#,
            TX_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(
                params![user_id, from.to_string(), to.to_string()],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }
}
