//! Item (linked institution) operations
//!
//! The items table is the credential vault: the access credential is written
//! once at registration and read back only for sync and revocation. Every
//! read is ownership-checked against the calling user so a guessed item id
//! never exposes another user's connection.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Item, ItemStatus};

fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(Item {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_item_id: row.get(2)?,
        access_credential: row.get(3)?,
        institution_name: row.get(4)?,
        institution_id: row.get(5)?,
        status: status_str.parse().unwrap_or(ItemStatus::Connected),
        created_at: parse_datetime(&created_at_str),
    })
}

const ITEM_COLUMNS: &str = "id, user_id, external_item_id, access_credential, \
    institution_name, institution_id, status, created_at";

impl Database {
    /// Register a newly linked item
    ///
    /// Fails with `DuplicateItem` when the external item id is already
    /// linked for this user; re-linking an institution must go through
    /// disconnect first rather than silently duplicating the connection.
    pub fn register_item(
        &self,
        user_id: &str,
        external_item_id: &str,
        access_credential: &str,
        institution_name: Option<&str>,
        institution_id: Option<&str>,
    ) -> Result<Item> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM items WHERE user_id = ? AND external_item_id = ?",
                params![user_id, external_item_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Err(Error::DuplicateItem(external_item_id.to_string()));
        }

        conn.execute(
            r#"
            INSERT INTO items (user_id, external_item_id, access_credential, institution_name, institution_id, status)
            VALUES (?, ?, ?, ?, ?, 'connected')
            "#,
            params![
                user_id,
                external_item_id,
                access_credential,
                institution_name,
                institution_id,
            ],
        )?;
        let id = conn.last_insert_rowid();

        self.get_item(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Item {} not found after insert", id)))
    }

    /// Get an item, ownership-checked
    pub fn get_item(&self, user_id: &str, item_id: i64) -> Result<Option<Item>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ? AND user_id = ?", ITEM_COLUMNS),
                params![item_id, user_id],
                row_to_item,
            )
            .optional()?;

        Ok(item)
    }

    /// Read the access credential for one of the caller's items
    ///
    /// Ownership is checked in the query itself, never inferred from the
    /// item id alone.
    pub fn get_access_credential(&self, user_id: &str, item_id: i64) -> Result<String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT access_credential FROM items WHERE id = ? AND user_id = ?",
            params![item_id, user_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Item {} not found", item_id)))
    }

    /// List a user's items regardless of status
    pub fn list_items(&self, user_id: &str) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE user_id = ? ORDER BY created_at",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![user_id], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List a user's connected items, the set a sync run iterates
    ///
    /// Items in `revoking` or `revoked` state are excluded so a revoked
    /// credential is never used again.
    pub fn list_connected_items(&self, user_id: &str) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE user_id = ? AND status = 'connected' ORDER BY created_at",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![user_id], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List every user with at least one connected item (for scheduled runs)
    pub fn list_synced_user_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id FROM items WHERE status = 'connected' ORDER BY user_id",
        )?;

        let users = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Update an item's lifecycle status
    pub fn set_item_status(&self, item_id: i64, status: ItemStatus) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE items SET status = ? WHERE id = ?",
            params![status.as_str(), item_id],
        )?;
        Ok(())
    }

    /// Delete an item and everything hanging off it
    ///
    /// Cascades in dependency order: transactions for the item's accounts,
    /// then balance history, then the accounts, then the item's sync-status
    /// row, then the item itself.
    pub fn delete_item_data(&self, item_id: i64) -> Result<()> {
        let conn = self.conn()?;

        // Use explicit transaction for atomicity
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            conn.execute(
                "DELETE FROM transactions WHERE account_id IN (SELECT id FROM accounts WHERE item_id = ?)",
                params![item_id],
            )?;
            conn.execute(
                "DELETE FROM balance_history WHERE account_id IN (SELECT id FROM accounts WHERE item_id = ?)",
                params![item_id],
            )?;
            conn.execute("DELETE FROM accounts WHERE item_id = ?", params![item_id])?;
            conn.execute("DELETE FROM sync_status WHERE item_id = ?", params![item_id])?;
            conn.execute("DELETE FROM items WHERE id = ?", params![item_id])?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Delete every row a user owns, innermost dependencies first
    pub fn delete_user_data(&self, user_id: &str) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            conn.execute("DELETE FROM transactions WHERE user_id = ?", params![user_id])?;
            conn.execute(
                "DELETE FROM balance_history WHERE account_id IN (SELECT id FROM accounts WHERE user_id = ?)",
                params![user_id],
            )?;
            conn.execute("DELETE FROM sync_status WHERE user_id = ?", params![user_id])?;
            conn.execute("DELETE FROM accounts WHERE user_id = ?", params![user_id])?;
            conn.execute("DELETE FROM items WHERE user_id = ?", params![user_id])?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}
