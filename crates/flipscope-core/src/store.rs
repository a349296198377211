//! Store contracts consumed by the scan engine.
//!
//! The engine never talks to a database directly; it is handed a catalog
//! store (read side) and a result store (write side) at construction. The
//! SQLite implementation lives in `flipscope-db`; tests use in-memory fakes.

use crate::error::StoreResult;
use crate::types::{Opportunity, ScanCounters, ScanRecord, ScanScope, ScanStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read side: resolves a scan scope into raw catalog rows.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Read the catalog rows covered by `scope` for the given user.
    ///
    /// An explicit-identifier scope yields synthesized rows with no source
    /// group; storefront scopes yield the stored listing rows.
    ///
    /// # Errors
    /// Returns error if the backing store cannot be read.
    async fn rows_for_scope(
        &self,
        user_id: &str,
        scope: &ScanScope,
    ) -> StoreResult<Vec<crate::types::ProductRow>>;
}

/// A partial update applied to a persisted scan record.
///
/// Only the populated fields are written; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ScanPatch {
    /// New lifecycle status
    pub status: Option<ScanStatus>,
    /// Updated counters
    pub counters: Option<ScanCounters>,
    /// Terminal error message
    pub error_message: Option<String>,
    /// Terminal timestamp
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanPatch {
    /// Patch carrying only updated counters.
    #[must_use]
    pub fn counters(counters: ScanCounters) -> Self {
        Self {
            counters: Some(counters),
            ..Self::default()
        }
    }

    /// Patch transitioning to a terminal status at `completed_at`.
    #[must_use]
    pub fn terminal(
        status: ScanStatus,
        counters: ScanCounters,
        error_message: Option<String>,
    ) -> Self {
        Self {
            status: Some(status),
            counters: Some(counters),
            error_message,
            completed_at: Some(Utc::now()),
        }
    }
}

/// Write side: scan records and the opportunities they discover.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Create a new scan record in the `Running` state.
    ///
    /// # Errors
    /// Returns error if the record cannot be written.
    async fn create_scan(&self, user_id: &str, scope: &ScanScope) -> StoreResult<ScanRecord>;

    /// Apply a partial update to a scan record.
    ///
    /// # Errors
    /// Returns error if the scan does not exist or the write fails.
    async fn update_scan(&self, scan_id: &str, patch: ScanPatch) -> StoreResult<()>;

    /// Persist one discovered opportunity against a scan.
    ///
    /// # Errors
    /// Returns error if the write fails; the engine treats this as fatal for
    /// the scan.
    async fn insert_opportunity(&self, scan_id: &str, opportunity: &Opportunity)
        -> StoreResult<()>;

    /// Fetch a scan record by id.
    ///
    /// # Errors
    /// Returns error if the read fails. A missing scan is `Ok(None)`.
    async fn get_scan(&self, scan_id: &str) -> StoreResult<Option<ScanRecord>>;

    /// Fetch the opportunities persisted so far for a scan, in discovery
    /// order. This backs the status/poll surface for consumers that cannot
    /// hold a live stream open.
    ///
    /// # Errors
    /// Returns error if the read fails.
    async fn opportunities_for_scan(&self, scan_id: &str) -> StoreResult<Vec<Opportunity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_patch_sets_timestamp() {
        let patch = ScanPatch::terminal(ScanStatus::Completed, ScanCounters::default(), None);
        assert_eq!(patch.status, Some(ScanStatus::Completed));
        assert!(patch.completed_at.is_some());
        assert!(patch.error_message.is_none());
    }

    #[test]
    fn test_counters_patch_leaves_status_untouched() {
        let counters = ScanCounters {
            total_units: 10,
            deduplicated_units: 8,
            processed: 3,
            found: 1,
        };
        let patch = ScanPatch::counters(counters);
        assert!(patch.status.is_none());
        assert_eq!(patch.counters, Some(counters));
    }
}
