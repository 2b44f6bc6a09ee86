//! Error types for quota-rs

use thiserror::Error;

use crate::ledger::UserId;

/// Result type alias for quota operations
pub type Result<T> = std::result::Result<T, QuotaError>;

/// Quota service error types
#[derive(Error, Debug)]
pub enum QuotaError {
    /// No ledger entry exists for the user
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// Quota values can never be negative
    #[error("Invalid quota value: {0}")]
    InvalidQuota(i64),

    /// Persistence failure in the ledger store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// User directory unreachable or returned garbage
    #[error("Directory error: {0}")]
    Directory(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A supervised background task panicked or was aborted
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl From<reqwest::Error> for QuotaError {
    fn from(e: reqwest::Error) -> Self {
        QuotaError::Directory(e.to_string())
    }
}
