//! Settings storage for application configuration.
//!
//! Provides key-value storage for user-tunable settings using the settings
//! table. Values are stored as JSON, enabling flexible schema-less
//! configuration.

use crate::error::{DatabaseError, Result};
use serde_json::Value;
use sqlx::SqlitePool;

/// Set a setting in the database
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &Value) -> Result<()> {
    let value_str = serde_json::to_string(value)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = datetime('now')
        ",
    )
    .bind(key)
    .bind(value_str)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a setting from the database
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<Value>> {
    let row: Option<(String,)> = sqlx::query_as(
        r"
        SELECT value
        FROM settings
        WHERE key = ?
        ",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((value_str,)) => {
            let value: Value = serde_json::from_str(&value_str)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Delete a setting from the database
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query(
        r"
        DELETE FROM settings
        WHERE key = ?
        ",
    )
    .bind(key)
    .execute(pool)
    .await?;

    Ok(())
}
