//! # tally-ledger: Purchase & Debtor Ledgers for Tally
//!
//! The one surface screens call. Every operation goes through
//! [`LedgerEngine`], which owns the Record Store, the Time Oracle, and a
//! handle to the sync engine.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         LedgerEngine                                    │
//! │                                                                         │
//! │  purchases   add_purchase · add_purchase_with_photo · update_purchase   │
//! │              void_purchase · refund_purchase · query_purchases          │
//! │              sales_summary · can_edit_purchase                          │
//! │                                                                         │
//! │  debtors     record_payment · recompute_debtors · debtor_purchases      │
//! │              debtor_summary · search_debtors                            │
//! │                                                                         │
//! │  registry    add_good · update_good · find_good_by_barcode              │
//! │              seed_sample_goods · set_stock_level · stock_report         │
//! │                                                                         │
//! │  backup      export · import                                            │
//! │                                                                         │
//! │  sync        sync_status · set_online                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let db = Database::new(DbConfig::from_env_or("tally.db")).await?;
//! let config = SyncConfig::load_or_default(None);
//! let connectivity = Connectivity::new(config.sync.start_online);
//! let clock = Arc::new(TimeOracle::from_config(&config, connectivity.clone())?);
//!
//! let sync = SyncEngine::builder(&db)
//!     .with_config(&config)?
//!     .connectivity(connectivity)
//!     .clock(clock.clone())
//!     .build();
//! let ledger = LedgerEngine::new(db, sync, clock).with_settings(LedgerSettings::from_env());
//!
//! let sale = ledger.add_purchase(PurchaseDraft::credit(items, "Amina", "555-1")).await?;
//! ```

pub mod backup;
pub mod debtors;
pub mod engine;
pub mod error;
pub mod photos;
pub mod purchases;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use backup::{BackupDocument, BACKUP_VERSION};
pub use engine::LedgerEngine;
pub use error::{ErrorKind, ErrorReport, LedgerError, LedgerResult};
pub use photos::{PhotoError, PhotoStore, RecordedPurchase, SqlitePhotoStore};
pub use settings::LedgerSettings;
