//! # tally-sync: Outbox Sync Engine for Tally
//!
//! Every ledger write lands in the durable `sync_queue` (see `tally-db`).
//! This crate delivers that queue to the remote service whenever the device
//! is online, and supplies the clock every ledger timestamp comes from.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sync Architecture                               │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    SyncEngine (Arc-shared)                       │  │
//! │  │                                                                  │  │
//! │  │  online flag ─── Connectivity (shared with TimeOracle)           │  │
//! │  │  syncing flag ── single-flight guard around flush()              │  │
//! │  │  lastError ───── reported through status()                       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ SyncQueue repo │  │  SyncEndpoint  │  │  NetworkProbe          │    │
//! │  │ (tally-db)     │  │                │  │                        │    │
//! │  │ snapshot /     │  │ HTTP POST of   │  │ HEAD health URL on     │    │
//! │  │ clear_through  │  │ one batch      │  │ every poll tick        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  TimeOracle: remote time when online, local clock otherwise.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Sync configuration (device ID, endpoint, time server)
//! - [`error`] - Sync error types
//! - [`network`] - Connectivity flag and health probe
//! - [`clock`] - `Clock` trait, manual clock, Time Oracle
//! - [`endpoint`] - Remote batch delivery
//! - [`engine`] - The `SyncEngine` and its background loop
//!
//! ## Usage
//! ```rust,ignore
//! let config = SyncConfig::load(None)?;
//! let sync = SyncEngine::builder(&db).with_config(&config)?.build();
//!
//! let probe = HttpNetworkProbe::from_config(&config)?.map(|p| Arc::new(p) as _);
//! let handle = sync.start(probe, config.poll_interval());
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod clock;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod network;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, HttpTimeSource, ManualClock, RemoteTimeSource, SystemClock, TimeOracle};
pub use config::SyncConfig;
pub use endpoint::{HttpSyncEndpoint, SyncBatch, SyncEndpoint};
pub use engine::{FlushOutcome, SkipReason, SyncEngine, SyncEngineBuilder, SyncLoopHandle, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use network::{Connectivity, HttpNetworkProbe, NetworkProbe};
