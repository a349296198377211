//! Batch orchestration: the scan state machine.
//!
//! One logical worker drives a scan from catalog load to terminal state:
//! `Loading -> Deduplicating -> Scanning(batch i of n) -> Finalizing ->
//! {Completed | Failed | Cancelled}`. Marketplace pricing calls within a
//! batch are issued strictly sequentially: the pricing quota tolerates no
//! burst, and concurrent fan-out across marketplaces would itself be a
//! burst even under a per-call gate, since the gate only serializes
//! same-class requests that have already reached it.

use crate::aggregate::aggregate;
use crate::caller::RetryingCaller;
use crate::dedupe::dedupe;
use crate::error::{Result, ScanError};
use crate::profit::ProfitCalculator;
use crate::progress::ProgressSender;
use crate::quota::EndpointClass;
use crate::session::ScanSession;
use crate::settings::ScanSettings;
use flipscope_core::{
    CatalogStore, MarketplaceCode, MarketplacePriceMap, PriceObservation, ProductUnit,
};
use flipscope_providers::{FeeProvider, PricingProvider};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one scan through its pipeline.
pub struct ScanOrchestrator {
    pricing: Arc<dyn PricingProvider>,
    fees: Arc<dyn FeeProvider>,
    catalog: Arc<dyn CatalogStore>,
    caller: RetryingCaller,
    calculator: ProfitCalculator,
    settings: ScanSettings,
}

impl ScanOrchestrator {
    /// Create an orchestrator over the injected providers and catalog.
    ///
    /// The retrying caller carries the quota gate; sharing one caller across
    /// orchestrators shares upstream quota state.
    #[must_use]
    pub fn new(
        pricing: Arc<dyn PricingProvider>,
        fees: Arc<dyn FeeProvider>,
        catalog: Arc<dyn CatalogStore>,
        caller: RetryingCaller,
        settings: ScanSettings,
    ) -> Self {
        let calculator = ProfitCalculator::new(
            settings.home.clone(),
            settings.exchange_rates.clone(),
            &settings.profit,
        );

        Self {
            pricing,
            fees,
            catalog,
            caller,
            calculator,
            settings,
        }
    }

    /// Drive `session` to a terminal state, emitting events into `progress`.
    ///
    /// Every outcome (success, fatal error, cancellation) terminates the
    /// session and emits exactly one terminal event; the consumer is never
    /// left to infer the outcome from stream silence.
    pub async fn run(
        &self,
        session: &mut ScanSession,
        progress: &mut ProgressSender,
        cancel: &CancellationToken,
    ) {
        match self.execute(session, progress, cancel).await {
            Ok(()) => {}
            Err(ScanError::Cancelled) => {
                tracing::info!(scan_id = %session.id(), "Scan cancelled by caller");
                if let Err(err) = session.cancel().await {
                    tracing::error!(scan_id = %session.id(), error = %err, "Failed to persist cancellation");
                }
                progress.error("scan cancelled by caller");
            }
            Err(err) => {
                tracing::error!(scan_id = %session.id(), error = %err, "Scan failed");
                if let Err(persist_err) = session.fail(err.to_string()).await {
                    tracing::error!(
                        scan_id = %session.id(),
                        error = %persist_err,
                        "Failed to persist scan failure"
                    );
                }
                progress.error(err.to_string());
            }
        }
    }

    async fn execute(
        &self,
        session: &mut ScanSession,
        progress: &mut ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Loading
        progress.progress("Loading catalog", 0, session.counters());
        let rows = self
            .catalog
            .rows_for_scope(session.user_id(), session.scope())
            .await?;
        if rows.is_empty() {
            return Err(ScanError::NoViableInput(
                "catalog scope resolved to zero rows".to_string(),
            ));
        }

        // Deduplicating
        progress.progress("Deduplicating catalog", 0, session.counters());
        let units = dedupe(&rows);
        if units.is_empty() {
            return Err(ScanError::NoViableInput(
                "zero units remained after deduplication".to_string(),
            ));
        }

        session.set_totals(rows.len() as u32, units.len() as u32);
        session.persist_counters().await?;

        let total = units.len();
        let batches: Vec<&[ProductUnit]> = units.chunks(self.settings.batch_size).collect();
        let batch_count = batches.len();

        // Scanning
        for (batch_index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let batch_started = Instant::now();
            progress.progress(
                format!("Scanning batch {}/{batch_count}", batch_index + 1),
                percent(session.counters().processed, total),
                session.counters(),
            );

            let responses = self.fetch_batch_prices(batch).await;
            let price_maps = aggregate(&responses);

            let mut fee_calls = 0u32;
            for unit in batch {
                if cancel.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
                self.process_unit(unit, &price_maps, total, session, progress, &mut fee_calls)
                    .await?;
            }

            session.persist_counters().await?;

            // Pace the next batch: if this batch ran faster than its call
            // volume permits under the quotas, sleep the difference. Guards
            // against clock skew and scheduling jitter the per-call gate
            // cannot see.
            if batch_index + 1 < batch_count {
                let pricing_calls = 1 + self.settings.foreign.len() as u32;
                let floor = quota_floor(
                    self.settings.pricing_quota.min_interval,
                    pricing_calls,
                    self.settings.fees_quota.min_interval,
                    fee_calls,
                );
                let elapsed = batch_started.elapsed();
                if elapsed < floor {
                    let pause = floor - elapsed;
                    tracing::debug!(pause_ms = pause.as_millis() as u64, "Pacing next batch");
                    tokio::time::sleep(pause).await;
                }
            }
        }

        // Finalizing
        let counters = session.counters();
        session.complete().await?;
        progress.progress("Finalizing", 100, counters);
        progress.complete(
            counters,
            format!(
                "Scan complete: {} opportunities across {} products",
                counters.found, counters.processed
            ),
        );
        Ok(())
    }

    /// Fetch one batch's prices for the home marketplace and every foreign
    /// marketplace, strictly sequentially. A failed marketplace degrades to
    /// an empty response instead of aborting the batch.
    async fn fetch_batch_prices(
        &self,
        batch: &[ProductUnit],
    ) -> Vec<(MarketplaceCode, Vec<PriceObservation>)> {
        let identifiers: Vec<String> = batch.iter().map(|unit| unit.identifier.clone()).collect();

        let mut marketplaces = Vec::with_capacity(1 + self.settings.foreign.len());
        marketplaces.push(self.settings.home.clone());
        marketplaces.extend(self.settings.foreign.iter().cloned());

        let mut responses = Vec::with_capacity(marketplaces.len());
        for marketplace in marketplaces {
            let outcome = self
                .caller
                .execute(EndpointClass::Pricing, || {
                    self.pricing.prices(&identifiers, &marketplace)
                })
                .await;

            match outcome {
                Ok(observations) => {
                    tracing::debug!(
                        %marketplace,
                        observations = observations.len(),
                        "Marketplace batch priced"
                    );
                    responses.push((marketplace, observations));
                }
                Err(err) => {
                    tracing::warn!(
                        %marketplace,
                        error = %err,
                        "Marketplace batch failed, degrading to no data"
                    );
                    responses.push((marketplace, Vec::new()));
                }
            }
        }
        responses
    }

    /// Price, fee, and profit steps for one unit. Unit-scoped provider
    /// failures are logged and skipped with the processed counter still
    /// advancing; only persistence failures propagate.
    async fn process_unit(
        &self,
        unit: &ProductUnit,
        price_maps: &HashMap<String, MarketplacePriceMap>,
        total: usize,
        session: &mut ScanSession,
        progress: &mut ProgressSender,
        fee_calls: &mut u32,
    ) -> Result<()> {
        let price_map = price_maps.get(&unit.identifier);
        let home_price = price_map
            .and_then(|map| map.get(&self.settings.home))
            .map(|observation| observation.amount)
            .filter(|amount| *amount > Decimal::ZERO);

        match (price_map, home_price) {
            (Some(price_map), Some(home_price)) => {
                *fee_calls += 1;
                let outcome = self
                    .caller
                    .execute(EndpointClass::Fees, || {
                        self.fees
                            .fee_estimate(&unit.identifier, home_price, &self.settings.home)
                    })
                    .await;

                match outcome {
                    Ok(estimate) => {
                        if let Some(opportunity) =
                            self.calculator.compute(unit, price_map, &estimate)
                        {
                            // Persist before emitting: the stream must never
                            // reference an opportunity the store rejected.
                            session.add_opportunity(&opportunity).await?;
                            progress.opportunity(opportunity);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            identifier = %unit.identifier,
                            error = %err,
                            "Fee estimate failed, skipping unit"
                        );
                    }
                }
            }
            _ => {
                tracing::debug!(identifier = %unit.identifier, "No usable home price");
            }
        }

        session.record_processed();
        progress.progress(
            format!("Processed {}", unit.identifier),
            percent(session.counters().processed, total),
            session.counters(),
        );
        Ok(())
    }
}

/// Percentage of processed units, saturating at 100.
fn percent(processed: u32, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = (u64::from(processed) * 100) / total as u64;
    value.min(100) as u8
}

/// Quota-implied minimum duration for a given call volume.
///
/// Exposed for tests; the orchestrator uses it for batch pacing.
#[must_use]
pub fn quota_floor(
    pricing_interval: Duration,
    pricing_calls: u32,
    fees_interval: Duration,
    fee_calls: u32,
) -> Duration {
    pricing_interval * pricing_calls + fees_interval * fee_calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_saturates() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
        assert_eq!(percent(9, 4), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_quota_floor_scales_with_call_volume() {
        let floor = quota_floor(
            Duration::from_millis(2000),
            5,
            Duration::from_millis(1000),
            18,
        );
        assert_eq!(floor, Duration::from_millis(28_000));
    }
}
