//! # Sync Engine
//!
//! Drains the durable sync queue to the remote endpoint whenever the device
//! is online.
//!
//! ## Flush Triggers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ledger write committed ──► schedule_flush() ──┐                        │
//! │  offline → online       ──► set_online(true) ──┼──► flush()             │
//! │  poll tick, queue > 0   ──► run() loop ────────┘      │                 │
//! │                                                       ▼                 │
//! │                          ┌──── offline? no endpoint? already syncing? ──┤
//! │                          │                                   skip       │
//! │                          ▼                                              │
//! │                  snapshot queue (through = max seq)                     │
//! │                          │                                              │
//! │                          ├── empty ──────────────────────► Empty        │
//! │                          ▼                                              │
//! │                  deliver (bounded by delivery_timeout)                  │
//! │                          │                                              │
//! │               ┌──────────┴──────────┐                                   │
//! │               ▼                     ▼                                   │
//! │       clear ≤ through,        keep queue,                               │
//! │       lastSync = now          lastError = reason                        │
//! │          Delivered               Failed                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - At most one flush runs at a time. Concurrent triggers are skipped, and
//!   the entries they would have sent go out with the next flush.
//! - Entries are never removed before the endpoint acknowledged them.
//! - Entries appended while a batch is in flight survive the clear.
//! - A flush never returns an error. Failures surface through [`SyncStatus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tally_db::{Database, SyncQueueRepository};

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::endpoint::{HttpSyncEndpoint, SyncEndpoint};
use crate::error::{SyncError, SyncResult};
use crate::network::{Connectivity, NetworkProbe};

// =============================================================================
// Status Types
// =============================================================================

/// Why a flush did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    NoEndpoint,
    InProgress,
}

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Skipped(SkipReason),
    /// Nothing was queued. `lastSync` is left alone.
    Empty,
    Delivered { count: usize },
    Failed { error: String },
}

impl FlushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, FlushOutcome::Delivered { .. })
    }
}

/// Sync status for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    pub pending_count: i64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

// =============================================================================
// Syncing Guard
// =============================================================================

/// Holds the single-flight flag for the duration of a flush.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncingGuard(flag))
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SyncEngine`].
///
/// ## Example
/// ```rust,ignore
/// let sync = SyncEngine::builder(&db)
///     .device_id("till-1")
///     .endpoint(Arc::new(HttpSyncEndpoint::new(url, timeout)?))
///     .build();
/// ```
pub struct SyncEngineBuilder {
    queue: SyncQueueRepository,
    endpoint: Option<Arc<dyn SyncEndpoint>>,
    clock: Arc<dyn Clock>,
    connectivity: Connectivity,
    device_id: String,
    delivery_timeout: Duration,
}

impl SyncEngineBuilder {
    pub fn endpoint(mut self, endpoint: Arc<dyn SyncEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Clock used for `lastSync`. Normally the shared
    /// [`TimeOracle`](crate::clock::TimeOracle).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Applies device, endpoint and delivery settings. Connectivity starts
    /// at `[sync].start_online`.
    pub fn with_config(mut self, config: &SyncConfig) -> SyncResult<Self> {
        self.device_id = config.device_id().to_string();
        self.delivery_timeout = config.delivery_timeout();
        self.connectivity.set(config.sync.start_online);
        if let Some(endpoint) = HttpSyncEndpoint::from_config(config)? {
            self.endpoint = Some(Arc::new(endpoint));
        }
        Ok(self)
    }

    pub fn build(self) -> Arc<SyncEngine> {
        Arc::new(SyncEngine {
            queue: self.queue,
            endpoint: self.endpoint,
            clock: self.clock,
            connectivity: self.connectivity,
            device_id: self.device_id,
            delivery_timeout: self.delivery_timeout,
            syncing: AtomicBool::new(false),
            last_error: RwLock::new(None),
        })
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Single-flight outbox flusher. Shared as `Arc<SyncEngine>`.
pub struct SyncEngine {
    queue: SyncQueueRepository,
    endpoint: Option<Arc<dyn SyncEndpoint>>,
    clock: Arc<dyn Clock>,
    connectivity: Connectivity,
    device_id: String,
    delivery_timeout: Duration,
    syncing: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl SyncEngine {
    /// Starts a builder with no endpoint, the system clock, and online
    /// connectivity.
    pub fn builder(db: &Database) -> SyncEngineBuilder {
        SyncEngineBuilder {
            queue: db.sync_queue(),
            endpoint: None,
            clock: Arc::new(SystemClock),
            connectivity: Connectivity::new(true),
            device_id: "local".to_string(),
            delivery_timeout: Duration::from_secs(15),
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Delivers everything queued so far.
    pub async fn flush(&self) -> FlushOutcome {
        if !self.is_online() {
            debug!("Flush skipped: offline");
            return FlushOutcome::Skipped(SkipReason::Offline);
        }

        let Some(endpoint) = self.endpoint.as_ref() else {
            debug!("Flush skipped: no endpoint configured");
            return FlushOutcome::Skipped(SkipReason::NoEndpoint);
        };

        let Some(_guard) = SyncingGuard::acquire(&self.syncing) else {
            debug!("Flush skipped: already syncing");
            return FlushOutcome::Skipped(SkipReason::InProgress);
        };

        match self.deliver_pending(endpoint.as_ref()).await {
            Ok(0) => FlushOutcome::Empty,
            Ok(count) => {
                *self.last_error.write().await = None;
                info!(count = count, "Sync queue flushed");
                FlushOutcome::Delivered { count }
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(error = %e, "Flush failed, queue kept for retry");
                } else {
                    error!(error = %e, "Flush failed");
                }
                let message = e.to_string();
                *self.last_error.write().await = Some(message.clone());
                FlushOutcome::Failed { error: message }
            }
        }
    }

    async fn deliver_pending(&self, endpoint: &dyn SyncEndpoint) -> SyncResult<usize> {
        let snapshot = self.queue.snapshot().await?;
        let Some(through) = snapshot.through else {
            return Ok(0);
        };

        debug!(entries = snapshot.entries.len(), through = through, "Delivering batch");

        tokio::time::timeout(
            self.delivery_timeout,
            endpoint.deliver(&self.device_id, &snapshot.entries),
        )
        .await
        .map_err(|_| SyncError::Timeout(self.delivery_timeout.as_millis() as u64))??;

        let synced_at = self.clock.now().await;
        self.queue.clear_through(through, synced_at).await?;

        Ok(snapshot.entries.len())
    }

    /// Starts a background flush if online and idle. Called after every
    /// committed ledger write.
    pub fn schedule_flush(self: &Arc<Self>) {
        if !self.is_online() || self.is_syncing() || self.endpoint.is_none() {
            return;
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.flush().await;
        });
    }

    /// Records a connectivity change. Going online flushes immediately and
    /// returns the outcome.
    pub async fn set_online(&self, online: bool) -> Option<FlushOutcome> {
        let was_online = self.connectivity.set(online);
        if was_online == online {
            return None;
        }

        if online {
            info!("Network available, flushing sync queue");
            Some(self.flush().await)
        } else {
            info!("Network lost, queueing writes locally");
            None
        }
    }

    /// Snapshot of the sync state. Never fails: storage errors are folded
    /// into `last_error`.
    pub async fn status(&self) -> SyncStatus {
        let mut last_error = self.last_error.read().await.clone();

        let pending_count = match self.queue.count().await {
            Ok(n) => n,
            Err(e) => {
                last_error.get_or_insert_with(|| e.to_string());
                0
            }
        };

        let last_sync = match self.queue.last_sync().await {
            Ok(at) => at,
            Err(e) => {
                last_error.get_or_insert_with(|| e.to_string());
                None
            }
        };

        SyncStatus {
            online: self.is_online(),
            syncing: self.is_syncing(),
            pending_count,
            last_sync,
            last_error,
        }
    }

    // =========================================================================
    // Background Loop
    // =========================================================================

    /// Spawns the connectivity/retry loop.
    pub fn start(self: &Arc<Self>, probe: Option<Arc<dyn NetworkProbe>>, poll_interval: Duration) -> SyncLoopHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            engine.run(probe, poll_interval, shutdown_rx).await;
        });

        SyncLoopHandle { shutdown_tx, task }
    }

    /// Every tick: re-probe connectivity (if a probe is configured), then
    /// retry a flush when online with entries pending.
    pub async fn run(
        &self,
        probe: Option<Arc<dyn NetworkProbe>>,
        poll_interval: Duration,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!(interval_secs = poll_interval.as_secs(), "Sync loop starting");

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(probe.as_deref()).await;
                }

                _ = shutdown_rx.recv() => {
                    info!("Sync loop shutting down");
                    break;
                }
            }
        }
    }

    async fn tick(&self, probe: Option<&dyn NetworkProbe>) {
        if let Some(probe) = probe {
            let reachable = probe.is_reachable().await;
            if self.set_online(reachable).await.is_some() {
                return;
            }
        }

        if !self.is_online() {
            return;
        }

        match self.queue.count().await {
            Ok(0) => {}
            Ok(pending) => {
                debug!(pending = pending, "Retrying pending sync entries");
                self.flush().await;
            }
            Err(e) => error!(error = %e, "Failed to count pending sync entries"),
        }
    }
}

/// Handle for the background loop started by [`SyncEngine::start`].
pub struct SyncLoopHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncLoopHandle {
    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) -> SyncResult<()> {
        // The loop may already have exited; the join below still succeeds.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| SyncError::ChannelError(format!("Sync loop panicked: {}", e)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
