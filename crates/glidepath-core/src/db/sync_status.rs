//! Sync status bookkeeping
//!
//! One row per (user, item) pair, overwritten on every transaction sync.
//! The composite-key upsert is what keeps concurrent syncs from growing
//! this table; there is deliberately no append path here.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::SyncStatus;

fn row_to_sync_status(row: &Row) -> rusqlite::Result<SyncStatus> {
    let last_synced_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;

    let today = chrono::Utc::now().date_naive();
    Ok(SyncStatus {
        user_id: row.get(0)?,
        item_id: row.get(1)?,
        last_synced_at: parse_datetime(&last_synced_str),
        sync_start_date: NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").unwrap_or(today),
        sync_end_date: NaiveDate::parse_from_str(&end_str, "%Y-%m-%d").unwrap_or(today),
        transaction_count: row.get(5)?,
    })
}

impl Database {
    /// Record the outcome of a transaction sync run for one item
    pub fn upsert_sync_status(
        &self,
        user_id: &str,
        item_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        transaction_count: i64,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO sync_status (user_id, item_id, last_synced_at, sync_start_date, sync_end_date, transaction_count)
            VALUES (?, ?, CURRENT_TIMESTAMP, ?, ?, ?)
            ON CONFLICT(user_id, item_id) DO UPDATE SET
                last_synced_at = CURRENT_TIMESTAMP,
                sync_start_date = excluded.sync_start_date,
                sync_end_date = excluded.sync_end_date,
                transaction_count = excluded.transaction_count
            "#,
            params![
                user_id,
                item_id,
                start_date.to_string(),
                end_date.to_string(),
                transaction_count,
            ],
        )?;
        Ok(())
    }

    /// Get the sync status row for one item, if any
    pub fn get_sync_status(&self, user_id: &str, item_id: i64) -> Result<Option<SyncStatus>> {
        let conn = self.conn()?;
        let status = conn
            .query_row(
                r#"
                SELECT user_id, item_id, last_synced_at, sync_start_date, sync_end_date, transaction_count
                FROM sync_status
                WHERE user_id = ? AND item_id = ?
                "#,
                params![user_id, item_id],
                row_to_sync_status,
            )
            .optional()?;

        Ok(status)
    }

    /// List the sync status rows for all of a user's items
    pub fn list_sync_statuses(&self, user_id: &str) -> Result<Vec<SyncStatus>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, item_id, last_synced_at, sync_start_date, sync_end_date, transaction_count
            FROM sync_status
            WHERE user_id = ?
            ORDER BY item_id
            "#,
        )?;

        let statuses = stmt
            .query_map(params![user_id], row_to_sync_status)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(statuses)
    }

    /// Get the most recent sync status across all of a user's items
    pub fn get_last_sync_status(&self, user_id: &str) -> Result<Option<SyncStatus>> {
        let conn = self.conn()?;
        let status = conn
            .query_row(
                r#"
                SELECT user_id, item_id, last_synced_at, sync_start_date, sync_end_date, transaction_count
                FROM sync_status
                WHERE user_id = ?
                ORDER BY last_synced_at DESC
                LIMIT 1
                "#,
                params![user_id],
                row_to_sync_status,
            )
            .optional()?;

        Ok(status)
    }
}
