//! Scan session lifecycle.
//!
//! A session owns one run's identity and counters and is the only component
//! that writes scan state to the result store. Terminal states are final:
//! once completed, failed, or cancelled, any further mutation is rejected.

use crate::error::{Result, ScanError};
use flipscope_core::{
    Opportunity, ResultStore, ScanCounters, ScanPatch, ScanScope, ScanStatus,
};
use std::sync::Arc;

/// One scan run: identity, counters, and the persistence of its results.
pub struct ScanSession {
    id: String,
    user_id: String,
    scope: ScanScope,
    status: ScanStatus,
    counters: ScanCounters,
    store: Arc<dyn ResultStore>,
}

impl ScanSession {
    /// Create a new running session, persisting the scan record.
    ///
    /// # Errors
    /// Returns `ScanError::Persistence` if the record cannot be created.
    pub async fn create(
        store: Arc<dyn ResultStore>,
        user_id: &str,
        scope: ScanScope,
    ) -> Result<Self> {
        let record = store.create_scan(user_id, &scope).await?;
        tracing::info!(scan_id = %record.id, %user_id, "Scan session created");

        Ok(Self {
            id: record.id,
            user_id: user_id.to_string(),
            scope,
            status: ScanStatus::Running,
            counters: ScanCounters::default(),
            store,
        })
    }

    /// The scan's unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The catalog scope this session covers.
    #[must_use]
    pub fn scope(&self) -> &ScanScope {
        &self.scope
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    /// Current counters snapshot.
    #[must_use]
    pub fn counters(&self) -> ScanCounters {
        self.counters
    }

    /// Record the catalog totals established after deduplication.
    pub fn set_totals(&mut self, total_units: u32, deduplicated_units: u32) {
        self.counters.total_units = total_units;
        self.counters.deduplicated_units = deduplicated_units;
    }

    /// Advance the processed counter by one unit.
    pub fn record_processed(&mut self) {
        self.counters.processed += 1;
    }

    /// Persist one discovered opportunity and advance the found counter.
    ///
    /// # Errors
    /// Returns `ScanError::SessionClosed` when the session is terminal
    /// (late-arriving opportunities are never silently persisted against a
    /// closed scan), or `ScanError::Persistence` if the write fails.
    pub async fn add_opportunity(&mut self, opportunity: &Opportunity) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ScanError::SessionClosed {
                status: self.status,
            });
        }

        self.store.insert_opportunity(&self.id, opportunity).await?;
        self.counters.found += 1;
        Ok(())
    }

    /// Persist the current counters without changing status.
    ///
    /// # Errors
    /// Returns `ScanError::Persistence` if the write fails.
    pub async fn persist_counters(&self) -> Result<()> {
        self.store
            .update_scan(&self.id, ScanPatch::counters(self.counters))
            .await?;
        Ok(())
    }

    /// Transition to `Completed`. Callable exactly once.
    ///
    /// # Errors
    /// Returns `ScanError::SessionClosed` if already terminal.
    pub async fn complete(&mut self) -> Result<()> {
        self.terminate(ScanStatus::Completed, None).await
    }

    /// Transition to `Failed` with a terminal error message.
    ///
    /// # Errors
    /// Returns `ScanError::SessionClosed` if already terminal.
    pub async fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.terminate(ScanStatus::Failed, Some(message.into()))
            .await
    }

    /// Transition to `Cancelled`, a distinct terminal outcome rather than
    /// a failure.
    ///
    /// # Errors
    /// Returns `ScanError::SessionClosed` if already terminal.
    pub async fn cancel(&mut self) -> Result<()> {
        self.terminate(ScanStatus::Cancelled, None).await
    }

    async fn terminate(&mut self, status: ScanStatus, error: Option<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ScanError::SessionClosed {
                status: self.status,
            });
        }

        // Terminal locally before the write: even a failed store update must
        // not leave the session accepting further mutation.
        self.status = status;
        tracing::info!(scan_id = %self.id, %status, "Scan session terminating");

        self.store
            .update_scan(&self.id, ScanPatch::terminal(status, self.counters, error))
            .await?;
        Ok(())
    }
}
