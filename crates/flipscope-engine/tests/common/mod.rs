//! In-memory store fakes shared by the engine integration tests.

use async_trait::async_trait;
use chrono::Utc;
use flipscope_core::{
    CatalogStore, Opportunity, ProductRow, ResultStore, ScanCounters, ScanPatch, ScanRecord,
    ScanScope, ScanStatus, StoreError, StoreResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// Catalog store backed by a fixed row list.
pub struct InMemoryCatalogStore {
    rows: Vec<ProductRow>,
}

impl InMemoryCatalogStore {
    pub fn new(rows: Vec<ProductRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn rows_for_scope(
        &self,
        _user_id: &str,
        scope: &ScanScope,
    ) -> StoreResult<Vec<ProductRow>> {
        let rows = match scope {
            ScanScope::AllStorefronts => self.rows.clone(),
            ScanScope::Storefront { storefront_id } => self
                .rows
                .iter()
                .filter(|row| row.source_group_id.as_deref() == Some(storefront_id))
                .cloned()
                .collect(),
            ScanScope::Storefronts { storefront_ids } => self
                .rows
                .iter()
                .filter(|row| {
                    row.source_group_id
                        .as_ref()
                        .is_some_and(|group| storefront_ids.contains(group))
                })
                .cloned()
                .collect(),
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

/// Result store fake with scriptable insert failures.
#[derive(Default)]
pub struct InMemoryResultStore {
    scans: Mutex<HashMap<String, ScanRecord>>,
    opportunities: Mutex<HashMap<String, Vec<Opportunity>>>,
    fail_inserts: AtomicBool,
    next_id: AtomicU32,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_opportunity` fail.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn scan(&self, scan_id: &str) -> Option<ScanRecord> {
        self.scans.lock().expect("scans lock").get(scan_id).cloned()
    }

    pub fn opportunities(&self, scan_id: &str) -> Vec<Opportunity> {
        self.opportunities
            .lock()
            .expect("opportunities lock")
            .get(scan_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn create_scan(&self, user_id: &str, scope: &ScanScope) -> StoreResult<ScanRecord> {
        let id = format!("scan-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = ScanRecord {
            id: id.clone(),
            user_id: user_id.to_string(),
            scope: scope.clone(),
            status: ScanStatus::Running,
            counters: ScanCounters::default(),
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        self.scans
            .lock()
            .expect("scans lock")
            .insert(id, record.clone());
        Ok(record)
    }

    async fn update_scan(&self, scan_id: &str, patch: ScanPatch) -> StoreResult<()> {
        let mut scans = self.scans.lock().expect("scans lock");
        let record = scans
            .get_mut(scan_id)
            .ok_or_else(|| StoreError::NotFound(scan_id.to_string()))?;

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(counters) = patch.counters {
            record.counters = counters;
        }
        if let Some(message) = patch.error_message {
            record.error_message = Some(message);
        }
        if let Some(completed_at) = patch.completed_at {
            record.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn insert_opportunity(
        &self,
        scan_id: &str,
        opportunity: &Opportunity,
    ) -> StoreResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("scripted insert failure".to_string()));
        }
        self.opportunities
            .lock()
            .expect("opportunities lock")
            .entry(scan_id.to_string())
            .or_default()
            .push(opportunity.clone());
        Ok(())
    }

    async fn get_scan(&self, scan_id: &str) -> StoreResult<Option<ScanRecord>> {
        Ok(self.scans.lock().expect("scans lock").get(scan_id).cloned())
    }

    async fn opportunities_for_scan(&self, scan_id: &str) -> StoreResult<Vec<Opportunity>> {
        Ok(self.opportunities(scan_id))
    }
}

/// Install a test subscriber once; honors `RUST_LOG` for scan debugging.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a catalog row for tests.
pub fn row(identifier: &str, name: Option<&str>, group: Option<&str>) -> ProductRow {
    ProductRow {
        identifier: identifier.to_string(),
        display_name: name.map(str::to_string),
        image_ref: None,
        sales_rank: None,
        source_group_id: group.map(str::to_string),
    }
}
