//! Revocation manager
//!
//! Handles explicit disconnects and full account deletion. The ordering
//! invariant: attempt external credential revocation first, then delete
//! local rows regardless of whether revocation succeeded. A failed external
//! revocation must not leave orphaned local data; it is surfaced as a
//! degraded outcome instead of a hard failure.

use tracing::{info, warn};

use crate::aggregator::{credential_fingerprint, Aggregator};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{DeleteOutcome, DisconnectOutcome, ItemStatus};

#[derive(Clone)]
pub struct RevocationManager {
    db: Database,
    aggregator: Aggregator,
}

impl RevocationManager {
    pub fn new(db: Database, aggregator: Aggregator) -> Self {
        Self { db, aggregator }
    }

    /// Disconnect one item, ownership-checked
    ///
    /// Marks the item revoking before the external call so a concurrent
    /// sync run stops iterating it, then cascades local deletion whether or
    /// not the aggregator accepted the revocation.
    pub async fn disconnect_item(&self, user_id: &str, item_id: i64) -> Result<DisconnectOutcome> {
        let item = self
            .db
            .get_item(user_id, item_id)?
            .ok_or_else(|| Error::NotFound(format!("Item {} not found", item_id)))?;

        self.db.set_item_status(item.id, ItemStatus::Revoking)?;

        let credential_revoked = match self
            .aggregator
            .revoke_credential(&item.access_credential)
            .await
        {
            Ok(()) => {
                info!(
                    item_id = item.id,
                    credential = %credential_fingerprint(&item.access_credential),
                    "Revoked aggregator credential"
                );
                true
            }
            Err(e) => {
                warn!(
                    item_id = item.id,
                    credential = %credential_fingerprint(&item.access_credential),
                    error = %e,
                    "Credential revocation failed, deleting local data anyway"
                );
                false
            }
        };

        self.db.delete_item_data(item.id)?;

        Ok(DisconnectOutcome {
            item_id: item.id,
            credential_revoked,
        })
    }

    /// Delete everything a user owns
    ///
    /// Revokes each item's credential independently; one failed revocation
    /// never blocks the others or the deletion itself. Returns how many
    /// credentials were actually revoked so the caller can surface a
    /// partial-success message.
    pub async fn delete_all_user_data(&self, user_id: &str) -> Result<DeleteOutcome> {
        let items = self.db.list_items(user_id)?;

        let mut credentials_revoked = 0;
        for item in &items {
            self.db.set_item_status(item.id, ItemStatus::Revoking)?;

            match self
                .aggregator
                .revoke_credential(&item.access_credential)
                .await
            {
                Ok(()) => credentials_revoked += 1,
                Err(e) => {
                    warn!(
                        item_id = item.id,
                        credential = %credential_fingerprint(&item.access_credential),
                        error = %e,
                        "Credential revocation failed during account deletion"
                    );
                }
            }
        }

        self.db.delete_user_data(user_id)?;

        info!(
            user = user_id,
            items = items.len(),
            revoked = credentials_revoked,
            "Deleted all user data"
        );

        Ok(DeleteOutcome {
            items_removed: items.len() as i64,
            credentials_revoked,
        })
    }
}
