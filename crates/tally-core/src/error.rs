//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Not found, invalid state, edit window          │
//! │  └── ValidationError  - Malformed or out-of-range input                │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Persistence failures                           │
//! │                                                                         │
//! │  tally-ledger errors                                                   │
//! │  └── LedgerError      - What screens see (with an ErrorKind)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → Screen              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sync failures never appear here: they are absorbed by the sync engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;
use crate::types::PurchaseStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledgers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No purchase has the requested id.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// No debtor account has the requested id.
    #[error("Debtor not found: {0}")]
    DebtorNotFound(String),

    /// No catalogue entry has the requested id.
    #[error("Good not found: {0}")]
    GoodNotFound(String),

    /// Purchase is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Voiding a purchase that is already voided or refunded
    /// - Refunding a purchase that is already voided or refunded
    /// - Editing a closed purchase
    #[error("Purchase {purchase_id} is {status}, cannot {operation}")]
    InvalidPurchaseState {
        purchase_id: String,
        status: PurchaseStatus,
        operation: &'static str,
    },

    /// Direct edit attempted after the edit window closed.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale created Monday 09:00
    ///      │
    ///      ▼
    /// Edit attempted Tuesday 09:01 (window = 24h)
    ///      │
    ///      ▼
    /// EditWindowExpired { window_hours: 24 }
    ///      │
    ///      ▼
    /// Screen shows: "Cannot edit this sale after 24 hours"
    ///               (void / refund remain available)
    /// ```
    #[error("Purchase {purchase_id} was created at {created_at}; edits are only allowed within {window_hours} hours")]
    EditWindowExpired {
        purchase_id: String,
        created_at: DateTime<Utc>,
        window_hours: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A purchase needs at least one line.
    #[error("a purchase must contain at least one item")]
    EmptyItems,

    /// A line's subtotal is not price × quantity.
    #[error("item {line} subtotal is {actual}, expected {expected}")]
    SubtotalMismatch {
        line: usize,
        expected: Money,
        actual: Money,
    },

    /// The submitted total is not the sum of the line subtotals.
    #[error("total is {actual}, expected {expected}")]
    TotalMismatch { expected: Money, actual: Money },

    /// An amount is too large to represent in minor units.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// An amount exceeds the limit allowed by the current record.
    #[error("{field} of {amount} exceeds {limit}")]
    ExceedsLimit {
        field: String,
        amount: Money,
        limit: Money,
    },

    /// A caller-supplied id is already taken in its collection.
    #[error("{collection} id '{id}' already exists")]
    DuplicateId { collection: String, id: String },

    /// A backup document was written by an incompatible version.
    #[error("backup version {found} is not supported (expected {supported})")]
    UnsupportedBackupVersion { found: u32, supported: u32 },

    /// A backup collection does not have the shape of its records.
    #[error("backup collection {collection} is malformed: {message}")]
    MalformedBackup { collection: String, message: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive { field: field.into() }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidPurchaseState {
            purchase_id: "p-1".to_string(),
            status: PurchaseStatus::Voided,
            operation: "refund",
        };
        assert_eq!(err.to_string(), "Purchase p-1 is voided, cannot refund");

        let err = ValidationError::TotalMismatch {
            expected: Money::from_major(100),
            actual: Money::from_major(90),
        };
        assert_eq!(err.to_string(), "total is 90.00, expected 100.00");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyItems.into();
        assert!(matches!(core_err, CoreError::Validation(ValidationError::EmptyItems)));
    }
}
