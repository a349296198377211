//! Database connection management.
//!
//! Provides a `SQLx` `SQLite` pool with foreign keys enforced and the
//! database file created on first use.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Open a connection pool for the database at `path`.
///
/// `:memory:` is accepted for tests; pair it with a single connection so
/// every query sees the same in-memory database.
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is invalid or the pool cannot
/// be created.
pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}
