//! # Record Store Errors
//!
//! ```text
//! sqlx::Error ──────────┐
//! MigrateError ─────────┼──► DbError ──► LedgerError::Storage ──► ErrorKind::Storage
//! serde_json::Error ────┘                (tally-ledger)
//! ```
//!
//! Every write runs in one SQLite transaction that rolls back on drop, so a
//! `DbError` from a write means nothing of it was stored.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The database could not be opened or the pool is closed.
    ///
    /// ## When This Occurs
    /// - The directory for the file does not exist or is read-only
    /// - The disk is full
    /// - [`Database::close`](crate::Database::close) was already called
    #[error("Cannot open ledger database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A collection document could not be encoded or decoded.
    ///
    /// ## When This Occurs
    /// - A collection was written by an incompatible version
    /// - The `records` table was edited by hand
    #[error("Collection '{key}' is unreadable: {message}")]
    Serialization { key: String, message: String },

    /// Every connection stayed busy for the whole acquire timeout.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn serialization(key: impl Into<String>, err: serde_json::Error) -> Self {
        DbError::Serialization {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
