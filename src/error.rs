//! Error types for cfkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CfkvError
pub type Result<T> = std::result::Result<T, CfkvError>;

/// Unified error type for cfkv operations
#[derive(Debug, Error)]
pub enum CfkvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Storage engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid request context: {0}")]
    InvalidContext(String),

    #[error("Reader already closed")]
    ReaderClosed,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    #[error("Value read failed: {0}")]
    ValueRead(String),

    #[error("Write batch failed: {0}")]
    WriteApply(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

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

    /// Error reported by the server inside a response
    #[error("Remote error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for CfkvError {
    fn from(err: bincode::Error) -> Self {
        CfkvError::Serialization(err.to_string())
    }
}
