//! Catalog item storage and scope resolution.
//!
//! Catalog items are the raw per-storefront listing rows the scan engine
//! deduplicates. Scope resolution joins through storefronts so one user can
//! never scan another user's catalog.

use crate::storefronts::parse_timestamp;
use chrono::{DateTime, Utc};
use flipscope_core::ProductRow;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

/// A stored catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier of the row
    pub id: String,
    /// Storefront the item was seen in
    pub storefront_id: String,
    /// Marketplace catalog identifier of the product
    pub identifier: String,
    /// Display name, if the listing carried one
    pub display_name: Option<String>,
    /// Image reference, if any
    pub image_ref: Option<String>,
    /// Sales rank signal, if any
    pub sales_rank: Option<u64>,
    /// When the item was recorded
    pub created_at: DateTime<Utc>,
}

/// Insert one catalog item.
///
/// # Errors
/// Returns `sqlx::Error` if the insert fails (including an unknown
/// storefront, via the foreign key).
#[allow(clippy::cast_possible_wrap)]
pub async fn create_catalog_item(
    pool: &Pool<Sqlite>,
    storefront_id: String,
    identifier: String,
    display_name: Option<String>,
    image_ref: Option<String>,
    sales_rank: Option<u64>,
) -> Result<CatalogItem, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = Utc::now();

    sqlx::query(
        "INSERT INTO catalog_items (id, storefront_id, identifier, display_name, image_ref, sales_rank, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&storefront_id)
    .bind(&identifier)
    .bind(&display_name)
    .bind(&image_ref)
    .bind(sales_rank.map(|rank| rank as i64))
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(CatalogItem {
        id,
        storefront_id,
        identifier,
        display_name,
        image_ref,
        sales_rank,
        created_at,
    })
}

/// List the items of one storefront in insertion order.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
#[allow(clippy::cast_sign_loss)]
pub async fn list_for_storefront(
    pool: &Pool<Sqlite>,
    storefront_id: &str,
) -> Result<Vec<CatalogItem>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, storefront_id, identifier, display_name, image_ref, sales_rank, created_at
         FROM catalog_items WHERE storefront_id = ? ORDER BY rowid",
    )
    .bind(storefront_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CatalogItem {
            id: row.get("id"),
            storefront_id: row.get("storefront_id"),
            identifier: row.get("identifier"),
            display_name: row.get("display_name"),
            image_ref: row.get("image_ref"),
            sales_rank: row.get::<Option<i64>, _>("sales_rank").map(|rank| rank as u64),
            created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        })
        .collect())
}

/// Delete one catalog item.
///
/// # Errors
/// Returns `sqlx::Error` if the delete fails.
pub async fn delete_catalog_item(pool: &Pool<Sqlite>, item_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM catalog_items WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read raw product rows for a user, optionally restricted to a storefront
/// set. `None` covers every storefront the user owns.
///
/// Rows come back in insertion order, which the engine preserves through
/// deduplication.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
#[allow(clippy::cast_sign_loss)]
pub async fn rows_for_user(
    pool: &Pool<Sqlite>,
    user_id: &str,
    storefront_ids: Option<&[String]>,
) -> Result<Vec<ProductRow>, sqlx::Error> {
    let base = "SELECT ci.identifier, ci.display_name, ci.image_ref, ci.sales_rank, ci.storefront_id
         FROM catalog_items ci
         JOIN storefronts s ON s.id = ci.storefront_id
         WHERE s.user_id = ?";

    let rows = match storefront_ids {
        Some(ids) => {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!("{base} AND ci.storefront_id IN ({placeholders}) ORDER BY ci.rowid");
            let mut query = sqlx::query(&sql).bind(user_id);
            for id in ids {
                query = query.bind(id);
            }
            query.fetch_all(pool).await?
        }
        None => {
            let sql = format!("{base} ORDER BY ci.rowid");
            sqlx::query(&sql).bind(user_id).fetch_all(pool).await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|row| ProductRow {
            identifier: row.get("identifier"),
            display_name: row.get("display_name"),
            image_ref: row.get("image_ref"),
            sales_rank: row.get::<Option<i64>, _>("sales_rank").map(|rank| rank as u64),
            source_group_id: Some(row.get("storefront_id")),
        })
        .collect())
}
