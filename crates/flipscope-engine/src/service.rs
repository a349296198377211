//! Public scan service: start scans, stream progress, poll status.

use crate::caller::RetryingCaller;
use crate::error::{Result, ScanError};
use crate::orchestrator::ScanOrchestrator;
use crate::progress::{progress_channel, ProgressStream};
use crate::quota::QuotaGate;
use crate::session::ScanSession;
use crate::settings::ScanSettings;
use flipscope_core::{CatalogStore, Opportunity, ResultStore, ScanRecord, ScanScope};
use flipscope_providers::{FeeProvider, PricingProvider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A started scan: its id, live event stream, and cancellation handle.
///
/// Dropping the handle does not stop the scan; results stay reachable via
/// [`ScanService::status`] for reconnect-after-disconnect consumers.
#[derive(Debug)]
pub struct ScanHandle {
    /// The persisted scan's identifier
    pub scan_id: String,
    /// Ordered progress event stream
    pub events: ProgressStream,
    cancel: CancellationToken,
}

impl ScanHandle {
    /// Request cancellation. In-flight external calls complete; no further
    /// calls are issued once the orchestrator observes the signal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Point-in-time view of a scan for polling consumers.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// The scan record as persisted
    pub record: ScanRecord,
    /// Opportunities persisted so far, in discovery order
    pub opportunities: Vec<Opportunity>,
}

/// The engine's public surface.
///
/// One service instance owns one quota gate: every scan started through it
/// shares upstream quota state, so concurrent scans against the same
/// credentials stay inside the official limits. Constructing a second
/// service isolates quota state; only do that for distinct upstream
/// accounts.
pub struct ScanService {
    orchestrator: Arc<ScanOrchestrator>,
    results: Arc<dyn ResultStore>,
}

impl ScanService {
    /// Wire a service from its collaborators.
    #[must_use]
    pub fn new(
        pricing: Arc<dyn PricingProvider>,
        fees: Arc<dyn FeeProvider>,
        catalog: Arc<dyn CatalogStore>,
        results: Arc<dyn ResultStore>,
        settings: ScanSettings,
    ) -> Self {
        let gate = Arc::new(QuotaGate::new(
            settings.pricing_quota,
            settings.fees_quota,
        ));
        let caller = RetryingCaller::new(gate, settings.pricing_cooldown, settings.fees_cooldown);
        let orchestrator = Arc::new(ScanOrchestrator::new(
            pricing, fees, catalog, caller, settings,
        ));

        Self {
            orchestrator,
            results,
        }
    }

    /// Start a scan for a verified user and return its live event stream.
    ///
    /// The scan record is created before this returns, so the id is
    /// immediately pollable; execution continues on a background task.
    ///
    /// # Errors
    /// Returns `ScanError::Persistence` if the scan record cannot be
    /// created.
    pub async fn start_scan(&self, user_id: &str, scope: ScanScope) -> Result<ScanHandle> {
        let mut session = ScanSession::create(Arc::clone(&self.results), user_id, scope).await?;
        let scan_id = session.id().to_string();

        let (mut sender, events) = progress_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            orchestrator.run(&mut session, &mut sender, &token).await;
        });

        Ok(ScanHandle {
            scan_id,
            events,
            cancel,
        })
    }

    /// Fetch the current state of a scan plus its persisted opportunities.
    ///
    /// # Errors
    /// Returns `ScanError::NotFound` for an unknown scan id, or
    /// `ScanError::Persistence` if the store read fails.
    pub async fn status(&self, scan_id: &str) -> Result<ScanSnapshot> {
        let record = self
            .results
            .get_scan(scan_id)
            .await?
            .ok_or_else(|| ScanError::NotFound(scan_id.to_string()))?;
        let opportunities = self.results.opportunities_for_scan(scan_id).await?;

        Ok(ScanSnapshot {
            record,
            opportunities,
        })
    }
}
