//! # Sync Endpoint
//!
//! Delivers one batch of queued collection snapshots to the remote service.
//!
//! ## Wire Format
//! ```text
//! POST <endpoint_url>
//! Content-Type: application/json
//!
//! {
//!   "deviceId": "till-1",
//!   "entries": [
//!     { "key": "purchases", "value": [...], "timestamp": "2026-03-01T10:00:00Z" },
//!     { "key": "debtors",   "value": [...], "timestamp": "2026-03-01T10:00:00Z" }
//!   ]
//! }
//! ```
//!
//! Any 2xx response acknowledges the whole batch. Everything else leaves the
//! queue untouched.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use tally_core::SyncQueueEntry;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Body of one delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch<'a> {
    pub device_id: &'a str,
    pub entries: &'a [SyncQueueEntry],
}

/// Remote receiver of queued snapshots.
#[async_trait]
pub trait SyncEndpoint: Send + Sync {
    /// Delivers `entries` in order. `Ok` means every entry was accepted.
    async fn deliver(&self, device_id: &str, entries: &[SyncQueueEntry]) -> SyncResult<()>;
}

/// JSON-over-HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpSyncEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpSyncEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSyncEndpoint {
            client,
            url: url.into(),
        })
    }

    /// Builds an endpoint from `[sync].endpoint_url`, if configured.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Option<Self>> {
        config
            .sync
            .endpoint_url
            .as_ref()
            .map(|url| HttpSyncEndpoint::new(url.clone(), config.delivery_timeout()))
            .transpose()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SyncEndpoint for HttpSyncEndpoint {
    async fn deliver(&self, device_id: &str, entries: &[SyncQueueEntry]) -> SyncResult<()> {
        let batch = SyncBatch { device_id, entries };

        let resp = self.client.post(&self.url).json(&batch).send().await?;
        let status = resp.status();

        debug!(url = %self.url, status = %status, entries = entries.len(), "Batch delivered");

        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_batch_wire_format() {
        let entries = vec![SyncQueueEntry {
            key: "goods".to_string(),
            value: json!([]),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        }];
        let batch = SyncBatch {
            device_id: "till-1",
            entries: &entries,
        };

        let wire = serde_json::to_value(&batch).unwrap();
        assert_eq!(wire["deviceId"], "till-1");
        assert_eq!(wire["entries"][0]["key"], "goods");
        assert_eq!(wire["entries"][0]["timestamp"], "2026-03-01T10:00:00Z");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retryable() {
        let endpoint =
            HttpSyncEndpoint::new("http://127.0.0.1:9/sync", Duration::from_millis(500)).unwrap();
        let err = endpoint.deliver("till-1", &[]).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
