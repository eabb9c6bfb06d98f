//! Error types for menukv
//!
//! Provides a unified error type for all operations.
//!
//! Callers of the menu layer only ever see three kinds:
//! [`MenuError::StorageUnavailable`], [`MenuError::NotFound`] and
//! [`MenuError::AllocationFailed`]. The remaining variants are produced by the
//! engine, WAL, protocol and network layers and are classified before they
//! leave [`crate::menu`].

use thiserror::Error;

/// Result type alias using MenuError
pub type Result<T> = std::result::Result<T, MenuError>;

/// Unified error type for menukv operations
#[derive(Debug, Error)]
pub enum MenuError {
    // -------------------------------------------------------------------------
    // Caller-facing Errors
    // -------------------------------------------------------------------------
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Menu {0} not found")]
    NotFound(u64),

    #[error("Id allocation failed: {0}")]
    AllocationFailed(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MenuError {
    /// Whether a single immediate retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MenuError::StorageUnavailable(_))
    }

    /// Reclassify a storage-layer failure as `StorageUnavailable`
    ///
    /// Caller-facing kinds pass through unchanged.
    pub fn into_unavailable(self) -> Self {
        match self {
            e @ (MenuError::StorageUnavailable(_)
            | MenuError::NotFound(_)
            | MenuError::AllocationFailed(_)) => e,
            other => MenuError::StorageUnavailable(other.to_string()),
        }
    }

    /// Reclassify a counter failure as `AllocationFailed`
    pub fn into_allocation_failed(self) -> Self {
        match self {
            MenuError::AllocationFailed(msg) => MenuError::AllocationFailed(msg),
            MenuError::StorageUnavailable(msg) => MenuError::AllocationFailed(msg),
            other => MenuError::AllocationFailed(other.to_string()),
        }
    }
}

impl From<bincode::Error> for MenuError {
    fn from(e: bincode::Error) -> Self {
        MenuError::Serialization(e.to_string())
    }
}
