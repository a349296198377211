//! Database error types.

use flipscope_core::StoreError;
use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Requested record was not found.
    #[error("{0}")]
    NotFound(String),

    /// Failed to decode database value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(message) => StoreError::NotFound(message),
            DatabaseError::Decode(message) | DatabaseError::Serialization(message) => {
                StoreError::Serialization(message)
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_store_not_found() {
        let err = DatabaseError::NotFound("scan 'abc' not found".to_string());
        let store_err: StoreError = err.into();
        assert!(matches!(store_err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_decode_maps_to_store_serialization() {
        let err = DatabaseError::Decode("bad status".to_string());
        let store_err: StoreError = err.into();
        assert!(matches!(store_err, StoreError::Serialization(_)));
    }
}
