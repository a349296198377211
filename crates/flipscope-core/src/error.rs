//! Core error types for the Flipscope application.
//!
//! This module defines the central error type used across all subsystems.
//! Each subsystem error is represented as a variant for clear error propagation.

use thiserror::Error;

/// Central error type for all Flipscope operations.
///
/// Each variant represents an error from a specific subsystem, allowing
/// for clear error propagation and handling across module boundaries.
#[derive(Error, Debug)]
pub enum FlipscopeError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store errors (catalog reads, scan/opportunity writes)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pricing/fee provider errors (HTTP, throttling, malformed responses)
    #[error("provider error: {0}")]
    Provider(String),

    /// Scan engine errors (orchestration, session lifecycle)
    #[error("scan error: {0}")]
    Scan(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found (may be first run)
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Errors surfaced by catalog and result store implementations.
///
/// Store backends (SQLite, in-memory fakes) translate their native failures
/// into these variants so the engine can react without knowing the backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend operation failed (connection, query, transaction)
    #[error("store backend error: {0}")]
    Backend(String),

    /// Requested record does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// Stored value could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using `FlipscopeError`.
pub type Result<T> = std::result::Result<T, FlipscopeError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
