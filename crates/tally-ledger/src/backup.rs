//! # Backup Export / Import
//!
//! Moves user collections in and out of the device as one JSON document.
//!
//! ```json
//! {
//!   "version": 1,
//!   "exportedAt": "2026-03-01T12:00:00Z",
//!   "collections": {
//!     "goods": [ ... ],
//!     "inventory": [ ... ]
//!   }
//! }
//! ```
//!
//! Import replaces each collection present in the document and leaves the
//! others alone. All replaced collections land in one transaction, and each
//! one still produces its own sync queue entry.
//!
//! ```text
//! import(doc)
//!      │
//!      ├── version != 1 ─────────────────────────► Err
//!      ├── records don't decode ─────────────────► Err (MalformedBackup)
//!      ├── purchase total != Σ subtotal ─────────► Err (MalformedBackup)
//!      │
//!      ├── purchases or debtors present?
//!      │        └── recompute(debtors, purchases) ─► debtors write
//!      ▼
//! set_many(all writes)
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use ts_rs::TS;

use tally_core::debtor::recompute;
use tally_core::validation::validate_items_and_total;
use tally_core::{Debtor, Good, InventoryItem, Purchase, ValidationError};
use tally_db::Collection;

use crate::engine::{encode, LedgerEngine};
use crate::error::LedgerResult;

/// Current backup document version.
pub const BACKUP_VERSION: u32 = 1;

/// A portable snapshot of user collections, keyed by collection name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u32,
    #[ts(as = "String")]
    pub exported_at: DateTime<Utc>,
    #[ts(type = "Record<string, unknown>")]
    pub collections: BTreeMap<String, Value>,
}

fn malformed(collection: Collection, message: impl Into<String>) -> ValidationError {
    ValidationError::MalformedBackup {
        collection: collection.key().to_string(),
        message: message.into(),
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, value: &Value) -> Result<T, ValidationError> {
    T::deserialize(value).map_err(|e| malformed(collection, e.to_string()))
}

/// Decodes imported purchases and checks `total == Σ subtotal` on each.
fn decode_purchases(value: &Value) -> Result<Vec<Purchase>, ValidationError> {
    let purchases: Vec<Purchase> = decode(Collection::Purchases, value)?;
    for purchase in &purchases {
        validate_items_and_total(&purchase.items, purchase.total)
            .map_err(|e| malformed(Collection::Purchases, format!("purchase {}: {}", purchase.id, e)))?;
    }
    Ok(purchases)
}

impl LedgerEngine {
    /// Exports the given collections. Sync bookkeeping is never exported.
    pub async fn export(&self, collections: &[Collection]) -> LedgerResult<BackupDocument> {
        let exported_at = self.clock.now().await;
        let mut out = BTreeMap::new();

        for collection in collections.iter().filter(|c| c.is_synced()) {
            let value = self.store.get_value(*collection).await?;
            out.insert(collection.key().to_string(), value);
        }

        info!(collections = out.len(), "Backup exported");
        Ok(BackupDocument {
            version: BACKUP_VERSION,
            exported_at,
            collections: out,
        })
    }

    /// Restores the collections present in `document`.
    ///
    /// Unknown keys are skipped with a warning. When purchases or debtors
    /// are imported, debtor accounts are rebuilt from the resulting ledger
    /// in the same write. Returns the collections that were written.
    ///
    /// # Errors
    /// `Validation` for an unsupported version, a collection whose records
    /// do not decode, or a purchase whose total is not Σ subtotal. Nothing
    /// is written in any of these cases.
    pub async fn import(&self, document: BackupDocument) -> LedgerResult<Vec<Collection>> {
        if document.version != BACKUP_VERSION {
            return Err(ValidationError::UnsupportedBackupVersion {
                found: document.version,
                supported: BACKUP_VERSION,
            }
            .into());
        }

        let mut purchases: Option<Vec<Purchase>> = None;
        let mut debtors: Option<Vec<Debtor>> = None;
        let mut writes = Vec::new();

        for (key, value) in document.collections {
            let Some(collection) = Collection::from_key(&key).filter(Collection::is_synced) else {
                warn!(key = %key, "Skipping unknown backup collection");
                continue;
            };
            match collection {
                Collection::Goods => {
                    decode::<Vec<Good>>(collection, &value)?;
                }
                Collection::Inventory => {
                    decode::<Vec<InventoryItem>>(collection, &value)?;
                }
                Collection::Purchases => purchases = Some(decode_purchases(&value)?),
                Collection::Debtors => debtors = Some(decode(collection, &value)?),
                Collection::LastSync => continue,
            }
            writes.push((collection, value));
        }

        if writes.is_empty() {
            return Ok(Vec::new());
        }

        let rebuild = purchases.is_some() || debtors.is_some();
        let mut locked: Vec<Collection> = writes.iter().map(|(c, _)| *c).collect();
        if rebuild {
            locked.extend([Collection::Purchases, Collection::Debtors]);
        }

        let _guard = self.store.lock(&locked).await;
        let now = self.clock.now().await;

        if rebuild {
            let purchases = match purchases {
                Some(imported) => imported,
                None => self.store.get(Collection::Purchases).await?,
            };
            let prior = match debtors {
                Some(imported) => imported,
                None => self.store.get(Collection::Debtors).await?,
            };
            let rebuilt = recompute(&prior, &purchases);
            debug!(debtors = rebuilt.len(), "Debtor accounts rebuilt from imported ledger");

            writes.retain(|(c, _)| *c != Collection::Debtors);
            writes.push(encode(Collection::Debtors, &rebuilt)?);
        }
        writes.sort_by_key(|(collection, _)| *collection);

        let imported: Vec<Collection> = writes.iter().map(|(c, _)| *c).collect();
        self.commit(writes, now).await?;

        info!(
            collections = ?imported.iter().map(Collection::key).collect::<Vec<_>>(),
            exported_at = %document.exported_at,
            "Backup imported"
        );
        Ok(imported)
    }
}
