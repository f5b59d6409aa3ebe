//! # Sync Queue Repository
//!
//! Reads and clears the durable outbox written by [`crate::store::RecordStore`].
//!
//! ## Snapshot-then-Clear
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  flush()                                                                │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  snapshot()  ─►  entries seq 1..=3, through = 3                         │
//! │    │                                                                    │
//! │    │      (ledger write lands here: seq 4 appended)                     │
//! │    ▼                                                                    │
//! │  deliver(entries 1..=3) ── ok                                           │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  ┌─────────────────── SINGLE TRANSACTION ──────────────────────────┐   │
//! │  │  DELETE FROM sync_queue WHERE seq <= 3     (seq 4 survives)     │   │
//! │  │  UPSERT records('lastSync', now)                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::store::{upsert_record, Collection};
use tally_core::SyncQueueEntry;

/// The queue contents at one instant.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    /// Highest sequence number included, `None` when empty.
    pub through: Option<i64>,
    /// Entries in insertion order.
    pub entries: Vec<SyncQueueEntry>,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Repository for sync queue operations.
#[derive(Debug, Clone)]
pub struct SyncQueueRepository {
    pool: SqlitePool,
}

impl SyncQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncQueueRepository { pool }
    }

    /// Returns every pending entry, oldest first.
    pub async fn snapshot(&self) -> DbResult<QueueSnapshot> {
        let rows = sqlx::query("SELECT seq, key, value, timestamp FROM sync_queue ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut snapshot = QueueSnapshot::default();
        for row in rows {
            let seq: i64 = row.try_get("seq")?;
            let key: String = row.try_get("key")?;
            let text: String = row.try_get("value")?;
            let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

            let value = serde_json::from_str(&text).map_err(|e| DbError::serialization(&key, e))?;
            snapshot.entries.push(SyncQueueEntry { key, value, timestamp });
            snapshot.through = Some(seq);
        }

        Ok(snapshot)
    }

    /// Deletes entries up to and including `through` and records `lastSync`,
    /// atomically. Returns the number of entries removed.
    pub async fn clear_through(&self, through: i64, synced_at: DateTime<Utc>) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM sync_queue WHERE seq <= ?1")
            .bind(through)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let stamp = serde_json::to_string(&synced_at)
            .map_err(|e| DbError::serialization(Collection::LastSync.key(), e))?;
        upsert_record(&mut *tx, Collection::LastSync.key(), &stamp, synced_at).await?;

        tx.commit().await?;

        debug!(through = through, removed = removed, "Sync queue cleared");
        Ok(removed)
    }

    /// Number of pending entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Time of the last successful flush, `None` if never synced.
    pub async fn last_sync(&self) -> DbResult<Option<DateTime<Utc>>> {
        let row: Option<String> = sqlx::query_scalar("SELECT value FROM records WHERE key = ?1")
            .bind(Collection::LastSync.key())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| DbError::serialization(Collection::LastSync.key(), e)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
