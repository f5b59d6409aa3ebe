//! # Repository Module
//!
//! Repositories for the tables that are not plain collection documents.
//!
//! ```text
//! Sync Engine                        Ledger (photo attachment)
//!      │                                   │
//!      │ db.sync_queue().snapshot()        │ db.photos().save(id, bytes, at)
//!      ▼                                   ▼
//! SyncQueueRepository                PhotoRepository
//! ├── snapshot()                     ├── save()
//! ├── clear_through()                └── get()
//! ├── count()
//! └── last_sync()
//!      │                                   │
//!      ▼                                   ▼
//!  sync_queue + records('lastSync')     photos
//! ```
//!
//! Collection documents themselves go through [`crate::store::RecordStore`].

pub mod photo;
pub mod sync;
