//! Account mirror and balance history operations

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Account, AccountKind, BalanceSample};

/// Fields of an account as reported by the aggregator, ready to merge
#[derive(Debug, Clone)]
pub struct AccountUpsert<'a> {
    pub external_account_id: &'a str,
    pub name: &'a str,
    pub kind: AccountKind,
    pub subtype: Option<&'a str>,
    pub current_balance: f64,
    pub available_balance: Option<f64>,
}

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    let kind_str: String = row.get(5)?;
    let last_synced_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(10)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        external_account_id: row.get(3)?,
        name: row.get(4)?,
        kind: kind_str.parse().unwrap_or(AccountKind::Other),
        subtype: row.get(6)?,
        current_balance: row.get(7)?,
        available_balance: row.get(8)?,
        last_synced_at: last_synced_str.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&created_at_str),
    })
}

const ACCOUNT_COLUMNS: &str = "id, user_id, item_id, external_account_id, name, kind, \
    subtype, current_balance, available_balance, last_synced_at, created_at";

impl Database {
    /// Merge an observed account into the mirror, keyed by external id
    ///
    /// A single insert-or-update statement rather than a read-then-write
    /// sequence, so concurrent syncs interleave safely. On conflict only the
    /// balance fields, display fields, and the sync timestamp move; the
    /// owning item never changes, which keeps the external account id bound
    /// to the item that first claimed it.
    pub fn upsert_account(
        &self,
        user_id: &str,
        item_id: i64,
        account: &AccountUpsert,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO accounts (user_id, item_id, external_account_id, name, kind, subtype,
                                  current_balance, available_balance, last_synced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(external_account_id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                subtype = excluded.subtype,
                current_balance = excluded.current_balance,
                available_balance = excluded.available_balance,
                last_synced_at = CURRENT_TIMESTAMP
            "#,
            params![
                user_id,
                item_id,
                account.external_account_id,
                account.name,
                account.kind.as_str(),
                account.subtype,
                account.current_balance,
                account.available_balance,
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM accounts WHERE external_account_id = ?",
            params![account.external_account_id],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account, ownership-checked
    pub fn get_account(&self, user_id: &str, account_id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE id = ? AND user_id = ?",
                    ACCOUNT_COLUMNS
                ),
                params![account_id, user_id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Map external account ids to local ids for one item
    ///
    /// Used by transaction sync to resolve the aggregator's account ids;
    /// transactions for accounts missing from this map are skipped.
    pub fn account_map(&self, item_id: i64) -> Result<HashMap<String, i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT external_account_id, id FROM accounts WHERE item_id = ?")?;

        let map = stmt
            .query_map(params![item_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(map)
    }

    /// Append one balance observation for an account
    ///
    /// Balance history is append-only; rows are never updated or merged.
    pub fn append_balance_sample(&self, account_id: i64, balance: f64) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO balance_history (account_id, balance) VALUES (?, ?)",
            params![account_id, balance],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List balance samples for an account, newest first
    pub fn list_balance_history(
        &self,
        user_id: &str,
        account_id: i64,
        limit: i64,
    ) -> Result<Vec<BalanceSample>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT h.id, h.account_id, h.balance, h.sampled_at
            FROM balance_history h
            JOIN accounts a ON a.id = h.account_id
            WHERE h.account_id = ? AND a.user_id = ?
            ORDER BY h.sampled_at DESC, h.id DESC
            LIMIT ?
            "#,
        )?;

        let samples = stmt
            .query_map(params![account_id, user_id, limit], |row| {
                let sampled_at_str: String = row.get(3)?;
                Ok(BalanceSample {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    balance: row.get(2)?,
                    sampled_at: parse_datetime(&sampled_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(samples)
    }

    /// Total current balance across a user's investment accounts
    ///
    /// One of the inputs a withdrawal-advice feature vector reads.
    pub fn total_investment_balance(&self, user_id: &str) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(current_balance), 0) FROM accounts WHERE user_id = ? AND kind = 'investment'",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Total current balance across a user's depository accounts
    pub fn total_cash_balance(&self, user_id: &str) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(current_balance), 0) FROM accounts WHERE user_id = ? AND kind = 'depository'",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
