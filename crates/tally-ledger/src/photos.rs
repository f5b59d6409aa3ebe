//! # Photo Attachments
//!
//! A purchase may carry a photo (a receipt, a signed credit note). The photo
//! is best-effort: failing to store it never fails the purchase.
//!
//! ```text
//! add_purchase_with_photo(draft, bytes)
//!      │
//!      ├── validate draft, check id ── rejected? ──► Err (nothing stored)
//!      │
//!      ├── PhotoStore::save ── ok ──────► photoRef = "photo_<id>"
//!      │                    └─ err ─────► photoRef = None, warning
//!      ▼
//! purchase persisted ──► RecordedPurchase { purchase, warnings }
//!      │
//!      └── write failed? ──► PhotoStore::delete, Err
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use tally_core::Purchase;
use tally_db::{Database, PhotoRepository};

use crate::engine::LedgerEngine;
use crate::error::LedgerResult;

/// Photo storage failure.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Photo data is empty")]
    Empty,

    #[error("Photo storage failed: {0}")]
    Storage(String),
}

impl From<tally_db::DbError> for PhotoError {
    fn from(err: tally_db::DbError) -> Self {
        PhotoError::Storage(err.to_string())
    }
}

/// Opaque image storage keyed by purchase.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores `data` for `purchase_id` and returns a reference for [`get`](Self::get).
    async fn save(&self, purchase_id: &str, data: &[u8], at: DateTime<Utc>) -> Result<String, PhotoError>;

    async fn get(&self, photo_ref: &str) -> Result<Option<Vec<u8>>, PhotoError>;

    async fn delete(&self, photo_ref: &str) -> Result<(), PhotoError>;
}

/// Photos kept in the local SQLite database.
#[derive(Debug, Clone)]
pub struct SqlitePhotoStore {
    repo: PhotoRepository,
}

impl SqlitePhotoStore {
    pub fn new(db: &Database) -> Self {
        SqlitePhotoStore { repo: db.photos() }
    }
}

#[async_trait]
impl PhotoStore for SqlitePhotoStore {
    async fn save(&self, purchase_id: &str, data: &[u8], at: DateTime<Utc>) -> Result<String, PhotoError> {
        if data.is_empty() {
            return Err(PhotoError::Empty);
        }
        Ok(self.repo.save(purchase_id, data, at).await?)
    }

    async fn get(&self, photo_ref: &str) -> Result<Option<Vec<u8>>, PhotoError> {
        Ok(self.repo.get(photo_ref).await?)
    }

    async fn delete(&self, photo_ref: &str) -> Result<(), PhotoError> {
        Ok(self.repo.delete(photo_ref).await?)
    }
}

impl LedgerEngine {
    /// Loads a photo by the `photoRef` stored on its purchase.
    pub async fn get_photo(&self, photo_ref: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.photos.get(photo_ref).await?)
    }
}

/// A purchase plus any non-fatal problems met while recording it.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPurchase {
    pub purchase: Purchase,
    pub warnings: Vec<String>,
}

impl RecordedPurchase {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_db::DbConfig;

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = SqlitePhotoStore::new(&db);

        let photo_ref = store.save("p1", &[1, 2, 3], Utc::now()).await.unwrap();
        assert_eq!(photo_ref, "photo_p1");
        assert_eq!(store.get(&photo_ref).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("photo_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_photo_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = SqlitePhotoStore::new(&db);
        assert!(matches!(store.save("p1", &[], Utc::now()).await, Err(PhotoError::Empty)));
    }
}
