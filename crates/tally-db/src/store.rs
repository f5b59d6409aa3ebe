//! # Record Store
//!
//! Durable key/value persistence for the ledger collections.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger operation                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.lock(&[Purchases, Debtors])  ← per-collection write locks,       │
//! │       │                               always acquired in enum order     │
//! │       ▼                                                                 │
//! │  read ── modify ── set_many(...)                                        │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  for each (collection, value):                                  │   │
//! │  │    1. UPSERT records(key, value)                                │   │
//! │  │    2. INSERT sync_queue(key, value, timestamp)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← every key is replaced and queued, or nothing changes         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Collection Registry
//! Defaults are declared per collection in [`Collection::default_value`]
//! rather than guessed from the key name.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Collection Registry
// =============================================================================

/// Every key the Record Store knows about.
///
/// The declaration order is the global lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Goods,
    Inventory,
    Purchases,
    Debtors,
    LastSync,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Goods,
        Collection::Inventory,
        Collection::Purchases,
        Collection::Debtors,
        Collection::LastSync,
    ];

    /// Collections holding user data (everything except sync bookkeeping).
    pub const USER: [Collection; 4] = [
        Collection::Goods,
        Collection::Inventory,
        Collection::Purchases,
        Collection::Debtors,
    ];

    /// Persisted key name.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Goods => "goods",
            Collection::Inventory => "inventory",
            Collection::Purchases => "purchases",
            Collection::Debtors => "debtors",
            Collection::LastSync => "lastSync",
        }
    }

    pub fn from_key(key: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Value returned when the key has never been written.
    ///
    /// ```text
    /// goods, inventory, purchases, debtors  → []
    /// lastSync                              → null (never synced)
    /// ```
    pub fn default_value(&self) -> Value {
        match self {
            Collection::LastSync => Value::Null,
            _ => Value::Array(Vec::new()),
        }
    }

    /// Whether writes to this collection are mirrored into the sync queue.
    ///
    /// `lastSync` is bookkeeping of the queue itself.
    pub fn is_synced(&self) -> bool {
        !matches!(self, Collection::LastSync)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Write Locks
// =============================================================================

/// One async mutex per collection.
#[derive(Debug, Default)]
pub struct CollectionLocks {
    locks: [Arc<Mutex<()>>; 5],
}

/// Holds write locks on a set of collections until dropped.
#[derive(Debug)]
pub struct CollectionGuard {
    held: Vec<Collection>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl CollectionGuard {
    pub fn holds(&self, collection: Collection) -> bool {
        self.held.contains(&collection)
    }
}

// =============================================================================
// Record Store
// =============================================================================

/// Handle to the Record Store. Cheap to clone; clones share the write locks.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
    locks: Arc<CollectionLocks>,
}

impl RecordStore {
    pub fn new(pool: SqlitePool, locks: Arc<CollectionLocks>) -> Self {
        RecordStore { pool, locks }
    }

    /// Acquires write locks on `collections` in the global order.
    ///
    /// Hold the guard across read-modify-write so two operations on the same
    /// collection cannot both start from the same snapshot.
    pub async fn lock(&self, collections: &[Collection]) -> CollectionGuard {
        let mut wanted = collections.to_vec();
        wanted.sort();
        wanted.dedup();

        let mut guards = Vec::with_capacity(wanted.len());
        for collection in &wanted {
            guards.push(self.locks.locks[collection.index()].clone().lock_owned().await);
        }

        CollectionGuard {
            held: wanted,
            _guards: guards,
        }
    }

    /// Reads a collection as raw JSON, or its registry default.
    pub async fn get_value(&self, collection: Collection) -> DbResult<Value> {
        let row: Option<String> = sqlx::query_scalar("SELECT value FROM records WHERE key = ?1")
            .bind(collection.key())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(text) => serde_json::from_str(&text).map_err(|e| DbError::serialization(collection.key(), e)),
            None => Ok(collection.default_value()),
        }
    }

    /// Reads and decodes a collection, or its registry default.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let purchases: Vec<Purchase> = store.get(Collection::Purchases).await?;
    /// ```
    pub async fn get<T: DeserializeOwned>(&self, collection: Collection) -> DbResult<T> {
        let value = self.get_value(collection).await?;
        serde_json::from_value(value).map_err(|e| DbError::serialization(collection.key(), e))
    }

    /// Replaces one collection and queues it for sync.
    pub async fn set<T: Serialize>(&self, collection: Collection, value: &T, at: DateTime<Utc>) -> DbResult<()> {
        let value = serde_json::to_value(value).map_err(|e| DbError::serialization(collection.key(), e))?;
        self.set_many(vec![(collection, value)], at).await
    }

    /// Replaces several collections in one transaction.
    ///
    /// Each synced collection gets its own queue entry, in the given order.
    pub async fn set_many(&self, writes: Vec<(Collection, Value)>, at: DateTime<Utc>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for (collection, value) in &writes {
            let text = serde_json::to_string(value).map_err(|e| DbError::serialization(collection.key(), e))?;
            upsert_record(&mut *tx, collection.key(), &text, at).await?;

            if collection.is_synced() {
                sqlx::query("INSERT INTO sync_queue (key, value, timestamp) VALUES (?1, ?2, ?3)")
                    .bind(collection.key())
                    .bind(&text)
                    .bind(at)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        debug!(
            keys = ?writes.iter().map(|(c, _)| c.key()).collect::<Vec<_>>(),
            "Records written"
        );
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Upserts one document. Shared with the sync-queue repository, which writes
/// `lastSync` in the same transaction that clears the queue.
pub(crate) async fn upsert_record(
    conn: &mut SqliteConnection,
    key: &str,
    value: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn store() -> (Database, RecordStore) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.records();
        (db, store)
    }

    #[test]
    fn test_registry_round_trips_keys() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_key(collection.key()), Some(collection));
        }
        assert_eq!(Collection::from_key("syncQueue"), None);
        assert!(!Collection::LastSync.is_synced());
    }

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let (_db, store) = store().await;

        assert_eq!(store.get_value(Collection::Goods).await.unwrap(), json!([]));
        assert_eq!(store.get_value(Collection::LastSync).await.unwrap(), Value::Null);

        let debtors: Vec<serde_json::Value> = store.get(Collection::Debtors).await.unwrap();
        assert!(debtors.is_empty());
    }

    #[tokio::test]
    async fn test_set_replaces_value_and_queues_entry() {
        let (db, store) = store().await;
        let now = Utc::now();

        store.set(Collection::Goods, &json!([{"id": "a"}]), now).await.unwrap();
        store.set(Collection::Goods, &json!([{"id": "b"}]), now).await.unwrap();

        assert_eq!(store.get_value(Collection::Goods).await.unwrap(), json!([{"id": "b"}]));
        assert_eq!(db.sync_queue().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_set_many_queues_each_synced_key() {
        let (db, store) = store().await;

        store
            .set_many(
                vec![
                    (Collection::Purchases, json!([1])),
                    (Collection::Debtors, json!([2])),
                    (Collection::LastSync, json!("2026-01-01T00:00:00Z")),
                ],
                Utc::now(),
            )
            .await
            .unwrap();

        let snapshot = db.sync_queue().snapshot().await.unwrap();
        let keys: Vec<_> = snapshot.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["purchases", "debtors"]);
    }

    #[tokio::test]
    async fn test_lock_serializes_same_collection() {
        let (_db, store) = store().await;

        let guard = store.lock(&[Collection::Debtors, Collection::Purchases]).await;
        assert!(guard.holds(Collection::Purchases));

        let other = store.clone();
        let waiting = tokio::spawn(async move {
            let _g = other.lock(&[Collection::Purchases]).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            db.records().set(Collection::Inventory, &json!([{"itemId": "a"}]), Utc::now()).await.unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(
            db.records().get_value(Collection::Inventory).await.unwrap(),
            json!([{"itemId": "a"}])
        );
        assert_eq!(db.sync_queue().count().await.unwrap(), 1);
    }
}
