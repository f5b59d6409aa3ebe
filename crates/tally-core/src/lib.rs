//! # tally-core: Pure Business Logic for the Tally ledger
//!
//! This crate is the **heart** of Tally. It contains the purchase lifecycle,
//! the debtor projection and every validation rule as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Screens (external)                           │   │
//! │  │    Sales ──► Debtors ──► Inventory ──► Backup                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-ledger (facade)                        │   │
//! │  │    add_purchase, void_purchase, record_payment, etc.            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ purchase  │  │  debtor   │  │   │
//! │  │   │ Purchase  │  │   Money   │  │ lifecycle │  │ recompute │  │   │
//! │  │   │  Debtor   │  │           │  │  window   │  │  payment  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK READS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tally-db + tally-sync (persistence, outbox)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Good, Purchase, Debtor, InventoryItem, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Arithmetic and range rules
//! - [`identity`] - Customer identity normalization
//! - [`purchase`] - Purchase state machine and edit window
//! - [`debtor`] - Incremental and full debtor projection
//! - [`report`] - Sales, debtor and stock summaries
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tally_core::{Money, Purchase, PurchaseDraft, PurchaseItem};
//!
//! let items = vec![PurchaseItem::new("g-rice", "Rice (1kg)", Money::from_major(50), 2)];
//! let purchase = Purchase::from_draft(PurchaseDraft::cash(items), Utc::now()).unwrap();
//!
//! assert_eq!(purchase.total, Money::from_major(100));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod debtor;
pub mod error;
pub mod identity;
pub mod money;
pub mod purchase;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::IdentityKey;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Hours after creation during which a purchase may be edited directly.
pub const DEFAULT_EDIT_WINDOW_HOURS: i64 = 24;

/// Stock levels strictly below this (and above zero) are reported as low.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// A debtor with an outstanding balance and no purchase for this many days
/// is reported as overdue.
pub const OVERDUE_AFTER_DAYS: i64 = 30;

/// Category assigned to goods created without one.
pub const DEFAULT_GOOD_CATEGORY: &str = "General";
