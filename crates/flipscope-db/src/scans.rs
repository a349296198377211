//! Scan record persistence.

use crate::error::{DatabaseError, Result};
use crate::storefronts::parse_timestamp;
use flipscope_core::{ScanCounters, ScanPatch, ScanRecord, ScanScope, ScanStatus};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

/// Create a new scan record in the `Running` state.
///
/// # Errors
/// Returns `DatabaseError` if the scope cannot be serialized or the insert
/// fails.
pub async fn create_scan(
    pool: &Pool<Sqlite>,
    user_id: &str,
    scope: &ScanScope,
) -> Result<ScanRecord> {
    let id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let status = ScanStatus::Running;
    let scope_json = serde_json::to_string(scope)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

    sqlx::query(
        "INSERT INTO scans (id, user_id, scope, status, started_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(&scope_json)
    .bind(status.to_string())
    .bind(started_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(ScanRecord {
        id,
        user_id: user_id.to_string(),
        scope: scope.clone(),
        status,
        counters: ScanCounters::default(),
        started_at,
        completed_at: None,
        error_message: None,
    })
}

/// Apply a partial update to a scan record. `None` fields are left
/// untouched.
///
/// # Errors
/// Returns `DatabaseError::NotFound` if the scan does not exist, or
/// `DatabaseError` if the update fails.
pub async fn update_scan(pool: &Pool<Sqlite>, scan_id: &str, patch: &ScanPatch) -> Result<()> {
    let result = sqlx::query(
        "UPDATE scans SET
             status = COALESCE(?, status),
             total_units = COALESCE(?, total_units),
             deduplicated_units = COALESCE(?, deduplicated_units),
             processed = COALESCE(?, processed),
             found = COALESCE(?, found),
             error_message = COALESCE(?, error_message),
             completed_at = COALESCE(?, completed_at)
         WHERE id = ?",
    )
    .bind(patch.status.map(|status| status.to_string()))
    .bind(patch.counters.map(|c| i64::from(c.total_units)))
    .bind(patch.counters.map(|c| i64::from(c.deduplicated_units)))
    .bind(patch.counters.map(|c| i64::from(c.processed)))
    .bind(patch.counters.map(|c| i64::from(c.found)))
    .bind(patch.error_message.clone())
    .bind(patch.completed_at.map(|at| at.to_rfc3339()))
    .bind(scan_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!(
            "scan '{scan_id}' not found"
        )));
    }
    Ok(())
}

/// Fetch one scan record by id.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored value cannot be
/// decoded.
pub async fn get_scan(pool: &Pool<Sqlite>, scan_id: &str) -> Result<Option<ScanRecord>> {
    let row = sqlx::query(
        "SELECT id, user_id, scope, status, total_units, deduplicated_units,
                processed, found, started_at, completed_at, error_message
         FROM scans WHERE id = ?",
    )
    .bind(scan_id)
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// List a user's scans, most recent first.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored value cannot be
/// decoded.
pub async fn list_for_user(pool: &Pool<Sqlite>, user_id: &str) -> Result<Vec<ScanRecord>> {
    let rows = sqlx::query(
        "SELECT id, user_id, scope, status, total_units, deduplicated_units,
                processed, found, started_at, completed_at, error_message
         FROM scans WHERE user_id = ? ORDER BY rowid DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(record_from_row).collect()
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn record_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ScanRecord> {
    let scope_json: String = row.get("scope");
    let scope: ScanScope = serde_json::from_str(&scope_json).map_err(|e| {
        DatabaseError::Decode(format!("invalid scope in scans table: {e}"))
    })?;

    Ok(ScanRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        scope,
        status: ScanStatus::parse(&row.get::<String, _>("status")),
        counters: ScanCounters {
            total_units: row.get::<i64, _>("total_units") as u32,
            deduplicated_units: row.get::<i64, _>("deduplicated_units") as u32,
            processed: row.get::<i64, _>("processed") as u32,
            found: row.get::<i64, _>("found") as u32,
        },
        started_at: parse_timestamp(&row.get::<String, _>("started_at")),
        completed_at: row
            .get::<Option<String>, _>("completed_at")
            .map(|at| parse_timestamp(&at)),
        error_message: row.get("error_message"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn create_test_db() -> Database {
        let db = Database::new(":memory:", 1).await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_create_and_get_scan() {
        let db = create_test_db().await;

        let scan = create_scan(db.pool(), "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");

        let fetched = get_scan(db.pool(), &scan.id)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.status, ScanStatus::Running);
        assert_eq!(fetched.scope, ScanScope::AllStorefronts);
        assert_eq!(fetched.counters, ScanCounters::default());
    }

    #[tokio::test]
    async fn test_update_counters_preserves_status() {
        let db = create_test_db().await;
        let scan = create_scan(db.pool(), "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");

        let counters = ScanCounters {
            total_units: 10,
            deduplicated_units: 8,
            processed: 3,
            found: 1,
        };
        update_scan(db.pool(), &scan.id, &ScanPatch::counters(counters))
            .await
            .expect("update counters");

        let fetched = get_scan(db.pool(), &scan.id)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(fetched.counters, counters);
        assert_eq!(fetched.status, ScanStatus::Running);
        assert!(fetched.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_terminal_update() {
        let db = create_test_db().await;
        let scan = create_scan(db.pool(), "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");

        let patch = ScanPatch::terminal(
            ScanStatus::Failed,
            ScanCounters::default(),
            Some("upstream exhausted".to_string()),
        );
        update_scan(db.pool(), &scan.id, &patch)
            .await
            .expect("terminal update");

        let fetched = get_scan(db.pool(), &scan.id)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(fetched.status, ScanStatus::Failed);
        assert_eq!(fetched.error_message.as_deref(), Some("upstream exhausted"));
        assert!(fetched.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_scan_is_not_found() {
        let db = create_test_db().await;

        let result = update_scan(
            db.pool(),
            "scan-missing",
            &ScanPatch::counters(ScanCounters::default()),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_scope_round_trip() {
        let db = create_test_db().await;
        let scope = ScanScope::Storefronts {
            storefront_ids: vec!["sf-1".to_string(), "sf-2".to_string()],
        };

        let scan = create_scan(db.pool(), "user-1", &scope)
            .await
            .expect("create scan");
        let fetched = get_scan(db.pool(), &scan.id)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(fetched.scope, scope);
    }

    #[tokio::test]
    async fn test_list_for_user_most_recent_first() {
        let db = create_test_db().await;
        let first = create_scan(db.pool(), "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");
        let second = create_scan(db.pool(), "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");

        let listed = list_for_user(db.pool(), "user-1").await.expect("list scans");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
