//! # Ledger Error Type
//!
//! Unified error type for every operation a screen can call.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Screen                       LedgerEngine                              │
//! │  ──────                       ────────────                              │
//! │                                                                         │
//! │  record_payment(...)                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Business rule broken? ── CoreError ─────┐                       │  │
//! │  │  SQLite failed?        ── DbError ───────┼──► LedgerError        │  │
//! │  │  Photo store failed?   ── PhotoError ────┘        │              │  │
//! │  │                                                   ▼              │  │
//! │  │                                   kind(): VALIDATION | NOT_FOUND │  │
//! │  │                                           INVALID_STATE          │  │
//! │  │                                           EDIT_WINDOW_EXPIRED    │  │
//! │  │                                           STORAGE                │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Sync failures never appear here: they only change the sync status.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

use crate::photos::PhotoError;

/// Error returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The Record Store failed. Nothing was written.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// The photo store failed on a read.
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

/// Machine-readable category of a [`LedgerError`].
///
/// ## Usage in Screens
/// ```typescript
/// switch (e.code) {
///   case 'EDIT_WINDOW_EXPIRED':
///     offerVoidOrRefund();
///     break;
///   case 'VALIDATION':
///     showForm(e.message);
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    EditWindowExpired,
    Storage,
}

/// What a screen receives when an operation fails.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Debtor not found: d-42" }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: ErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Domain(err) => match err {
                CoreError::PurchaseNotFound(_) | CoreError::DebtorNotFound(_) | CoreError::GoodNotFound(_) => {
                    ErrorKind::NotFound
                }
                CoreError::InvalidPurchaseState { .. } => ErrorKind::InvalidState,
                CoreError::EditWindowExpired { .. } => ErrorKind::EditWindowExpired,
                CoreError::Validation(_) => ErrorKind::Validation,
            },
            LedgerError::Storage(_) | LedgerError::Photo(_) => ErrorKind::Storage,
        }
    }

    /// Screen-facing form. Storage details are logged, not shown.
    pub fn to_report(&self) -> ErrorReport {
        let message = match self {
            LedgerError::Domain(err) => err.to_string(),
            LedgerError::Storage(err) => {
                tracing::error!(error = %err, "Storage failure");
                "Could not save or load data on this device".to_string()
            }
            LedgerError::Photo(err) => {
                tracing::error!(error = %err, "Photo storage failure");
                "Could not load the photo".to_string()
            }
        };

        ErrorReport {
            code: self.kind(),
            message,
        }
    }
}

/// Convenience type alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;
