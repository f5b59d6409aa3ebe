//! # tally-db: Record Store for the Tally ledger
//!
//! This crate provides durable local storage: a SQLite key/value Record
//! Store for the ledger collections, the durable sync queue that mirrors
//! every write, and photo blobs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Ledger operation (add_purchase)          Sync Engine (flush)           │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  RecordStore  │    │ Repositories │  │   │
//! │  │   │   (pool.rs)   │    │  (store.rs)   │    │              │  │   │
//! │  │   │               │    │               │    │ SyncQueue    │  │   │
//! │  │   │ SqlitePool    │◄───│ Collection    │    │ Photo        │  │   │
//! │  │   │ Migrations    │    │ write locks   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: records · sync_queue · photos                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Collection, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let store = db.records();
//!
//! let _guard = store.lock(&[Collection::Goods]).await;
//! let mut goods: Vec<Good> = store.get(Collection::Goods).await?;
//! goods.push(good);
//! store.set(Collection::Goods, &goods, now).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{Collection, CollectionGuard, RecordStore};

pub use repository::photo::{photo_ref_for, PhotoRepository};
pub use repository::sync::{QueueSnapshot, SyncQueueRepository};
