//! Error types for the storage engine.
//!
//! The B-tree core distinguishes soft failures (a missing key — never
//! an error, just `None`/no-op) from hard assertions (capacity and
//! invariant violations, which indicate a caller or implementation bug
//! and panic via `assert!` at the point of violation) from genuine
//! I/O failures propagated unchanged from the buffer manager.

use crate::types::PageId;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage engine.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page was not found in the buffer manager.
    #[error("page {0} not found")]
    PageNotFound(PageId),

    /// Data corruption detected (e.g., checksum mismatch).
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Invalid page format or type.
    #[error("invalid page: {0}")]
    InvalidPage(String),

    /// Buffer manager has no available frames to pin another page.
    #[error("buffer manager exhausted: no available frames")]
    BufferManagerExhausted,

    /// Invalid operation for the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Database file is corrupted or has invalid format.
    #[error("invalid database file: {0}")]
    InvalidDatabaseFile(String),

    /// A node invariant (sorted keys, separator contract, count bounds)
    /// does not hold. Surfaced only by the non-fatal `validate` routines
    /// used in tests; in the mutating path these are hard assertions.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl StorageError {
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    pub fn invalid_page(msg: impl Into<String>) -> Self {
        Self::InvalidPage(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn invalid_db(msg: impl Into<String>) -> Self {
        Self::InvalidDatabaseFile(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
