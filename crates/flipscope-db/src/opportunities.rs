//! Opportunity persistence.
//!
//! The full opportunity (fee breakdown, per-marketplace entries) is stored
//! as a JSON payload; the columns worth filtering on (identifier, best
//! marketplace, category, profit) are denormalized alongside it.

use crate::error::{DatabaseError, Result};
use flipscope_core::Opportunity;
use sqlx::{Pool, Row, Sqlite};

/// Persist one opportunity against a scan, in discovery order.
///
/// # Errors
/// Returns `DatabaseError` if serialization or the insert fails.
pub async fn insert_opportunity(
    pool: &Pool<Sqlite>,
    scan_id: &str,
    opportunity: &Opportunity,
) -> Result<()> {
    let id = uuid::Uuid::new_v4().to_string();
    let payload = serde_json::to_string(opportunity)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    let profit = opportunity
        .best_entry()
        .map(|entry| entry.profit.to_string())
        .unwrap_or_else(|| "0".to_string());

    sqlx::query(
        "INSERT INTO opportunities (id, scan_id, identifier, best_marketplace, category, profit, payload, discovered_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(scan_id)
    .bind(&opportunity.identifier)
    .bind(opportunity.best_marketplace.as_str())
    .bind(opportunity.category.to_string())
    .bind(profit)
    .bind(&payload)
    .bind(opportunity.discovered_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a scan's opportunities in discovery order.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a payload cannot be
/// decoded.
pub async fn get_by_scan(pool: &Pool<Sqlite>, scan_id: &str) -> Result<Vec<Opportunity>> {
    let rows = sqlx::query("SELECT payload FROM opportunities WHERE scan_id = ? ORDER BY rowid")
        .bind(scan_id)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let payload: String = row.get("payload");
            serde_json::from_str(&payload).map_err(|e| {
                DatabaseError::Decode(format!("invalid opportunity payload: {e}"))
            })
        })
        .collect()
}

/// Count a scan's opportunities.
///
/// # Errors
/// Returns `DatabaseError` if the query fails.
pub async fn count_for_scan(pool: &Pool<Sqlite>, scan_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM opportunities WHERE scan_id = ?")
        .bind(scan_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
