//! # Ledger Engine
//!
//! The facade screens hold. One instance per process, cheap to clone.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  operation(args)                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock collections it touches (fixed global order)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  now = clock.now()          (Time Oracle)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read ─► apply tally-core rule ─► Err? return, nothing written          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────── SINGLE TRANSACTION (set_many) ───────────────────┐    │
//! │  │  records[purchases] = ...    sync_queue += purchases            │    │
//! │  │  records[debtors]   = ...    sync_queue += debtors              │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sync.schedule_flush()      (fire-and-forget, never fails the write)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads never take locks and always see the last committed write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use tally_core::{Debtor, Good, InventoryItem, Purchase};
use tally_db::{Collection, Database, DbError, RecordStore};
use tally_sync::{Clock, FlushOutcome, SyncEngine, SyncStatus};

use crate::error::LedgerResult;
use crate::photos::{PhotoStore, SqlitePhotoStore};
use crate::settings::LedgerSettings;

/// Entry point for every ledger operation.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env_or("tally.db")).await?;
/// let sync = SyncEngine::builder(&db).with_config(&sync_config)?.build();
/// let ledger = LedgerEngine::new(db, sync, clock);
///
/// let purchase = ledger.add_purchase(PurchaseDraft::cash(items)).await?;
/// ```
#[derive(Clone)]
pub struct LedgerEngine {
    pub(crate) db: Database,
    pub(crate) store: RecordStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) sync: Arc<SyncEngine>,
    pub(crate) photos: Arc<dyn PhotoStore>,
    pub(crate) settings: LedgerSettings,
}

impl LedgerEngine {
    /// Creates an engine with default settings and SQLite photo storage.
    pub fn new(db: Database, sync: Arc<SyncEngine>, clock: Arc<dyn Clock>) -> Self {
        let store = db.records();
        let photos = Arc::new(SqlitePhotoStore::new(&db));
        LedgerEngine {
            db,
            store,
            clock,
            sync,
            photos,
            settings: LedgerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_photo_store(mut self, photos: Arc<dyn PhotoStore>) -> Self {
        self.photos = photos;
        self
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn sync(&self) -> &Arc<SyncEngine> {
        &self.sync
    }

    /// Current time as the ledger sees it.
    pub async fn now(&self) -> DateTime<Utc> {
        self.clock.now().await
    }

    // =========================================================================
    // Read Projections
    // =========================================================================

    pub async fn list_goods(&self) -> LedgerResult<Vec<Good>> {
        Ok(self.store.get(Collection::Goods).await?)
    }

    pub async fn list_purchases(&self) -> LedgerResult<Vec<Purchase>> {
        Ok(self.store.get(Collection::Purchases).await?)
    }

    pub async fn list_debtors(&self) -> LedgerResult<Vec<Debtor>> {
        Ok(self.store.get(Collection::Debtors).await?)
    }

    pub async fn list_inventory(&self) -> LedgerResult<Vec<InventoryItem>> {
        Ok(self.store.get(Collection::Inventory).await?)
    }

    // =========================================================================
    // Sync Passthrough
    // =========================================================================

    pub async fn sync_status(&self) -> SyncStatus {
        self.sync.status().await
    }

    /// Reports a connectivity change from the host platform. Coming online
    /// flushes the queue before returning.
    pub async fn set_online(&self, online: bool) -> Option<FlushOutcome> {
        self.sync.set_online(online).await
    }

    // =========================================================================
    // Write Helpers
    // =========================================================================

    /// Commits `writes` atomically, then nudges the sync engine.
    pub(crate) async fn commit(&self, writes: Vec<(Collection, Value)>, at: DateTime<Utc>) -> LedgerResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        self.store.set_many(writes, at).await?;
        self.sync.schedule_flush();
        Ok(())
    }
}

/// Encodes one collection for [`LedgerEngine::commit`].
pub(crate) fn encode<T: Serialize>(collection: Collection, value: &T) -> LedgerResult<(Collection, Value)> {
    let value = serde_json::to_value(value).map_err(|e| DbError::serialization(collection.key(), e))?;
    Ok((collection, value))
}
