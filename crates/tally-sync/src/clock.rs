//! # Time Oracle
//!
//! Resolves "now" for every ledger timestamp.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TimeOracle::now()                                                      │
//! │       │                                                                 │
//! │       ├── offline or no time server? ──────────────► local clock        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fetch remote time (bounded by timeout)                                 │
//! │       │                                                                 │
//! │       ├── ok ─────────────────────────────────────► remote time         │
//! │       └── timeout / HTTP error / bad body ────────► local clock         │
//! │                                                    (logged, never an    │
//! │                                                     error to the caller)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote time keeps timestamps comparable across devices once synced. It is
//! best-effort only.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::Connectivity;

// =============================================================================
// Clock
// =============================================================================

/// A source of the current time.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn now(&self) -> DateTime<Utc>;
}

/// The device clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to drive edit-window and
/// overdue logic deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock { now: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn get(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn now(&self) -> DateTime<Utc> {
        self.get()
    }
}

// =============================================================================
// Remote Time Source
// =============================================================================

/// An authoritative remote time service.
#[async_trait]
pub trait RemoteTimeSource: Send + Sync {
    async fn fetch(&self) -> SyncResult<DateTime<Utc>>;
}

#[derive(Debug, Deserialize)]
struct TimeResponse {
    datetime: String,
}

/// Reads `{"datetime": "<RFC 3339>"}` from a URL.
#[derive(Debug, Clone)]
pub struct HttpTimeSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTimeSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpTimeSource {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RemoteTimeSource for HttpTimeSource {
    async fn fetch(&self) -> SyncResult<DateTime<Utc>> {
        let body: TimeResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_remote_time(&body.datetime)
    }
}

fn parse_remote_time(raw: &str) -> SyncResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SyncError::InvalidTimeResponse(format!("{}: {}", raw, e)))
}

// =============================================================================
// Time Oracle
// =============================================================================

/// Remote time when reachable, local clock otherwise.
pub struct TimeOracle {
    remote: Option<Arc<dyn RemoteTimeSource>>,
    fallback: Arc<dyn Clock>,
    connectivity: Connectivity,
    timeout: Duration,
}

impl TimeOracle {
    pub fn new(
        remote: Option<Arc<dyn RemoteTimeSource>>,
        fallback: Arc<dyn Clock>,
        connectivity: Connectivity,
        timeout: Duration,
    ) -> Self {
        TimeOracle {
            remote,
            fallback,
            connectivity,
            timeout,
        }
    }

    /// Local clock only.
    pub fn local(fallback: Arc<dyn Clock>) -> Self {
        TimeOracle::new(None, fallback, Connectivity::new(false), Duration::from_secs(1))
    }

    /// Builds an oracle from `[time]`, falling back to the system clock.
    pub fn from_config(config: &SyncConfig, connectivity: Connectivity) -> SyncResult<Self> {
        let remote = match &config.time.url {
            Some(url) => Some(Arc::new(HttpTimeSource::new(url.clone(), config.time_timeout())?)
                as Arc<dyn RemoteTimeSource>),
            None => None,
        };
        Ok(TimeOracle::new(
            remote,
            Arc::new(SystemClock),
            connectivity,
            config.time_timeout(),
        ))
    }
}

#[async_trait]
impl Clock for TimeOracle {
    async fn now(&self) -> DateTime<Utc> {
        let Some(remote) = self.remote.as_ref().filter(|_| self.connectivity.is_online()) else {
            return self.fallback.now().await;
        };

        match tokio::time::timeout(self.timeout, remote.fetch()).await {
            Ok(Ok(at)) => at,
            Ok(Err(e)) => {
                debug!(error = %e, "Remote time unavailable, using local clock");
                self.fallback.now().await
            }
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Remote time timed out, using local clock");
                self.fallback.now().await
            }
        }
    }
}
