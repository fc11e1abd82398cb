//! Error types for FlagKV
//!
//! Provides a unified error type for store, protocol and client operations,
//! plus the narrower [`DecodeError`] returned by the codec.

use thiserror::Error;

/// Result type alias using FlagKvError
pub type Result<T> = std::result::Result<T, FlagKvError>;

/// Unified error type for FlagKV operations
#[derive(Debug, Error)]
pub enum FlagKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: usize, max: usize },

    #[error("Store error: {0}")]
    Store(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure to turn `(bytes, flags)` back into a value.
///
/// Always surfaced to the caller; the codec never retries or falls back
/// except for unknown flags, which decode as raw text instead of failing.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes flagged JSON are not a well-formed JSON document
    #[error("malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// Bytes flagged NUMERIC are not a finite decimal number
    #[error("malformed number: {0:?}")]
    MalformedNumber(String),

    /// Bytes flagged BINARY could not be passed through the inverse transform
    #[error("binary transform failed: {0}")]
    BinaryTransformFailure(String),
}
