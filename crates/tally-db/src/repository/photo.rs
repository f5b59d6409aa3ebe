//! # Photo Repository
//!
//! Opaque image blobs attached to purchases, keyed by `photo_<purchaseId>`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Reference under which a purchase's photo is stored.
pub fn photo_ref_for(purchase_id: &str) -> String {
    format!("photo_{}", purchase_id)
}

/// Repository for photo blobs.
#[derive(Debug, Clone)]
pub struct PhotoRepository {
    pool: SqlitePool,
}

impl PhotoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PhotoRepository { pool }
    }

    /// Stores (or replaces) the photo of a purchase and returns its reference.
    pub async fn save(&self, purchase_id: &str, data: &[u8], at: DateTime<Utc>) -> DbResult<String> {
        let photo_ref = photo_ref_for(purchase_id);

        sqlx::query(
            r#"
            INSERT INTO photos (photo_ref, purchase_id, data, created_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(photo_ref) DO UPDATE SET data = excluded.data, created_at = excluded.created_at
            "#,
        )
        .bind(&photo_ref)
        .bind(purchase_id)
        .bind(data)
        .bind(at)
        .execute(&self.pool)
        .await?;

        debug!(photo_ref = %photo_ref, bytes = data.len(), "Photo saved");
        Ok(photo_ref)
    }

    pub async fn get(&self, photo_ref: &str) -> DbResult<Option<Vec<u8>>> {
        let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT data FROM photos WHERE photo_ref = ?1")
            .bind(photo_ref)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data)
    }

    /// Removes a photo. Missing photos are not an error.
    pub async fn delete(&self, photo_ref: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM photos WHERE photo_ref = ?1")
            .bind(photo_ref)
            .execute(&self.pool)
            .await?;
        debug!(photo_ref = %photo_ref, "Photo deleted");
        Ok(())
    }
}
