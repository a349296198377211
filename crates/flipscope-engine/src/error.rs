//! Error types for the scan engine.

use flipscope_core::{ScanStatus, StoreError};
use flipscope_providers::ProviderError;
use thiserror::Error;

/// Errors raised while driving a scan.
///
/// Unit- and marketplace-scoped provider failures are swallowed by the
/// orchestrator with a log and a counter advance; the variants here either
/// terminate the scan or report a misuse of the session lifecycle.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Upstream call failed after the single retry, or returned malformed data
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    /// Catalog scope resolved to zero units, or zero units remained after
    /// deduplication. Fatal to the scan.
    #[error("no viable catalog input: {0}")]
    NoViableInput(String),

    /// Result store rejected a write. Fatal to the affected scan.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Caller-initiated stop; a distinct terminal outcome, not a failure
    #[error("scan cancelled by caller")]
    Cancelled,

    /// An operation was attempted against a session in a terminal state
    #[error("scan session is already terminal ({status})")]
    SessionClosed {
        /// The terminal status the session holds
        status: ScanStatus,
    },

    /// Requested scan does not exist
    #[error("scan not found: {0}")]
    NotFound(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ScanError>;
