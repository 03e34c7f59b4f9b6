//! Storage error types
//!
//! Message-carrying variants so errors can be cloned across the
//! transaction driver boundary (the driver keeps the first failure to
//! report at commit time while also acknowledging the submitting worker).

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur against a storage backend
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Failed to create a repository session
    #[error("failed to create repository for {dns:?}: {message}")]
    Connect {
        /// Backend connection string
        dns: String,
        /// What went wrong
        message: String,
    },

    /// The DNS string carries no known scheme
    #[error("unknown storage scheme in {dns:?}")]
    UnknownScheme {
        /// Backend connection string
        dns: String,
    },

    /// An upsert failed
    #[error("upsert failed: {0}")]
    Upsert(String),

    /// A truncate failed
    #[error("truncate failed: {0}")]
    Truncate(String),

    /// Commit failed
    #[error("commit failed: {0}")]
    Commit(String),

    /// Rollback failed
    #[error("rollback failed: {0}")]
    Rollback(String),

    /// The transaction driver is gone
    #[error("transaction closed")]
    TxnClosed,
}

impl StorageError {
    /// Create a Connect error
    pub fn connect(dns: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            dns: dns.into(),
            message: message.into(),
        }
    }

    /// Create an Upsert error
    pub fn upsert(message: impl Into<String>) -> Self {
        Self::Upsert(message.into())
    }

    /// Create a Commit error
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit(message.into())
    }
}
