//! Flipscope Database Layer
//!
//! Provides `SQLite` database access for the Flipscope stores: storefronts,
//! catalog items, scans, opportunities, and settings. Uses `SQLx` with
//! embedded, versioned migrations.
//!
//! The [`Database`] wrapper implements the core [`CatalogStore`] and
//! [`ResultStore`] traits, making it a drop-in backend for the scan engine.
//!
//! # Example
//!
//! ```ignore
//! use flipscope_db::Database;
//!
//! let db = Database::new("flipscope.db", 5).await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod catalog;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod opportunities;
pub mod scans;
pub mod settings;
pub mod storefronts;

// Re-export commonly used types
pub use error::{DatabaseError, Result};

use async_trait::async_trait;
use flipscope_core::{
    CatalogStore, Opportunity, ProductRow, ResultStore, ScanPatch, ScanRecord, ScanScope,
    StoreResult,
};
use sqlx::{Pool, Sqlite};

/// High-level database interface with automatic migrations.
#[derive(Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database at `path`.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for tests)
    /// * `max_connections` - Connection pool size
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<std::path::Path>, max_connections: u32) -> Result<Self> {
        let pool = connection::connect(path, max_connections).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version (number of applied migrations).
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[async_trait]
impl CatalogStore for Database {
    async fn rows_for_scope(
        &self,
        user_id: &str,
        scope: &ScanScope,
    ) -> StoreResult<Vec<ProductRow>> {
        let rows = match scope {
            ScanScope::AllStorefronts => catalog::rows_for_user(&self.pool, user_id, None)
                .await
                .map_err(DatabaseError::from)?,
            ScanScope::Storefront { storefront_id } => {
                let ids = [storefront_id.clone()];
                catalog::rows_for_user(&self.pool, user_id, Some(&ids))
                    .await
                    .map_err(DatabaseError::from)?
            }
            ScanScope::Storefronts { storefront_ids } => {
                catalog::rows_for_user(&self.pool, user_id, Some(storefront_ids))
                    .await
                    .map_err(DatabaseError::from)?
            }
            // Explicit identifier lists bypass the stored catalog entirely
            ScanScope::Identifiers { identifiers } => identifiers
                .iter()
                .map(|identifier| ProductRow {
                    identifier: identifier.clone(),
                    display_name: None,
                    image_ref: None,
                    sales_rank: None,
                    source_group_id: None,
                })
                .collect(),
        };
        Ok(rows)
    }
}

#[async_trait]
impl ResultStore for Database {
    async fn create_scan(&self, user_id: &str, scope: &ScanScope) -> StoreResult<ScanRecord> {
        Ok(scans::create_scan(&self.pool, user_id, scope).await?)
    }

    async fn update_scan(&self, scan_id: &str, patch: ScanPatch) -> StoreResult<()> {
        Ok(scans::update_scan(&self.pool, scan_id, &patch).await?)
    }

    async fn insert_opportunity(
        &self,
        scan_id: &str,
        opportunity: &Opportunity,
    ) -> StoreResult<()> {
        Ok(opportunities::insert_opportunity(&self.pool, scan_id, opportunity).await?)
    }

    async fn get_scan(&self, scan_id: &str) -> StoreResult<Option<ScanRecord>> {
        Ok(scans::get_scan(&self.pool, scan_id).await?)
    }

    async fn opportunities_for_scan(&self, scan_id: &str) -> StoreResult<Vec<Opportunity>> {
        Ok(opportunities::get_by_scan(&self.pool, scan_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_db() -> Database {
        let db = Database::new(":memory:", 1).await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_database_creation_and_migration() {
        let db = create_test_db().await;
        let version = db.get_schema_version().await.expect("get version");
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_catalog_store_scope_resolution() {
        let db = create_test_db().await;

        let storefront = storefronts::create_storefront(
            db.pool(),
            "user-1".to_string(),
            "Euro Toys".to_string(),
            "DE".to_string(),
        )
        .await
        .expect("create storefront");

        catalog::create_catalog_item(
            db.pool(),
            storefront.id.clone(),
            "A1".to_string(),
            Some("Widget".to_string()),
            None,
            None,
        )
        .await
        .expect("create item");

        let rows = db
            .rows_for_scope("user-1", &ScanScope::AllStorefronts)
            .await
            .expect("rows for scope");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_group_id.as_deref(), Some(storefront.id.as_str()));

        let rows = db
            .rows_for_scope(
                "user-1",
                &ScanScope::Identifiers {
                    identifiers: vec!["B9".to_string()],
                },
            )
            .await
            .expect("rows for identifiers");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identifier, "B9");
        assert!(rows[0].source_group_id.is_none());
    }

    #[tokio::test]
    async fn test_result_store_scan_lifecycle() {
        let db = create_test_db().await;

        let record = ResultStore::create_scan(&db, "user-1", &ScanScope::AllStorefronts)
            .await
            .expect("create scan");

        let fetched = ResultStore::get_scan(&db, &record.id)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(fetched.id, record.id);

        let missing = ResultStore::get_scan(&db, "scan-missing")
            .await
            .expect("get scan");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_database_close() {
        let db = create_test_db().await;
        db.close().await; // Should not panic
    }
}
