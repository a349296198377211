//! Storefront management.
//!
//! A storefront is one source grouping of catalog items, typically another
//! seller's store being tracked for sourcing leads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

/// A tracked storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storefront {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Marketplace the storefront lives in
    pub marketplace: String,
    /// When the storefront was added
    pub created_at: DateTime<Utc>,
}

/// Create a new storefront.
///
/// # Errors
/// Returns `sqlx::Error` if the insert fails.
pub async fn create_storefront(
    pool: &Pool<Sqlite>,
    user_id: String,
    name: String,
    marketplace: String,
) -> Result<Storefront, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = Utc::now();

    sqlx::query(
        "INSERT INTO storefronts (id, user_id, name, marketplace, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user_id)
    .bind(&name)
    .bind(&marketplace)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Storefront {
        id,
        user_id,
        name,
        marketplace,
        created_at,
    })
}

/// Get one storefront by id.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn get_storefront(
    pool: &Pool<Sqlite>,
    storefront_id: &str,
) -> Result<Option<Storefront>, sqlx::Error> {
    let row: Option<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, user_id, name, marketplace, created_at
         FROM storefronts WHERE id = ?",
    )
    .bind(storefront_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, user_id, name, marketplace, created_at)| Storefront {
        id,
        user_id,
        name,
        marketplace,
        created_at: parse_timestamp(&created_at),
    }))
}

/// List a user's storefronts in creation order.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn list_storefronts(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<Vec<Storefront>, sqlx::Error> {
    let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, user_id, name, marketplace, created_at
         FROM storefronts WHERE user_id = ? ORDER BY rowid",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, user_id, name, marketplace, created_at)| Storefront {
            id,
            user_id,
            name,
            marketplace,
            created_at: parse_timestamp(&created_at),
        })
        .collect())
}

/// Delete a storefront and (via cascade) its catalog items.
///
/// # Errors
/// Returns `sqlx::Error` if the delete fails.
pub async fn delete_storefront(pool: &Pool<Sqlite>, storefront_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM storefronts WHERE id = ?")
        .bind(storefront_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
