//! Error types for the provider subsystem.

use thiserror::Error;

/// Errors that can occur during provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Upstream signaled that its request quota was exceeded
    #[error("throttled by {endpoint}: {message}")]
    Throttled {
        /// Endpoint name
        endpoint: String,
        /// Upstream message
        message: String,
    },

    /// API error with status code
    #[error("API error ({endpoint}): status {status}, {message}")]
    Api {
        /// Endpoint name
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Invalid API key or authentication failure
    #[error("authentication failed for {endpoint}: {message}")]
    Authentication {
        /// Endpoint name
        endpoint: String,
        /// Error message
        message: String,
    },

    /// Response parsing error
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse {
        /// Endpoint name
        endpoint: String,
        /// Error message
        message: String,
    },

    /// Request validation error
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    /// Whether this error is a throttling signal that the retrying caller
    /// may recover from with a cooldown and a single retry.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
