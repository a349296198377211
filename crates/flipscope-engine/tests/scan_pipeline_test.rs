//! End-to-end pipeline tests: mock providers, in-memory stores, paused clock.

mod common;

use common::{row, InMemoryCatalogStore, InMemoryResultStore};
use flipscope_core::{AppConfig, MarketplaceCode, ScanScope, ScanStatus};
use flipscope_engine::{ProgressEvent, ScanService, ScanSettings};
use flipscope_providers::mock::{observation, MockFeeProvider, MockPricingProvider};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn us() -> MarketplaceCode {
    MarketplaceCode::new("US").expect("valid code")
}

fn de() -> MarketplaceCode {
    MarketplaceCode::new("DE").expect("valid code")
}

/// Settings with one foreign marketplace (DE at parity) and fast quotas so
/// paused-clock tests stay readable.
fn test_settings() -> ScanSettings {
    let mut config = AppConfig::default();
    config.marketplaces.foreign = vec!["DE".to_string()];
    config
        .marketplaces
        .exchange_rates
        .insert("DE".to_string(), dec!(1.00));
    config.scanning.batch_size = 2;
    config.quota.pricing.min_interval_ms = 20;
    config.quota.pricing.retry_cooldown_ms = 50;
    config.quota.fees.min_interval_ms = 10;
    config.quota.fees.burst = 1;
    config.quota.fees.retry_cooldown_ms = 30;
    ScanSettings::from_config(&config).expect("valid test settings")
}

/// Catalog of 3 identifiers, one of them listed under two storefronts.
fn test_catalog() -> InMemoryCatalogStore {
    InMemoryCatalogStore::new(vec![
        row("A1", Some("Widget"), Some("sf-1")),
        row("A2", Some("Gadget"), Some("sf-1")),
        row("A1", Some("Widget (EU)"), Some("sf-2")),
        row("A3", Some("Gizmo"), Some("sf-2")),
    ])
}

/// Home prices for A1 and A2 only; DE prices for all three. A1 is clearly
/// profitable, A2 is not.
fn test_pricing() -> MockPricingProvider {
    MockPricingProvider::new()
        .with_observation(observation("A1", &us(), dec!(100.00), "USD", true))
        .with_observation(observation("A2", &us(), dec!(20.00), "USD", true))
        .with_observation(observation("A1", &de(), dec!(40.00), "EUR", true))
        .with_observation(observation("A2", &de(), dec!(40.00), "EUR", true))
        .with_observation(observation("A3", &de(), dec!(15.00), "EUR", true))
}

fn service(
    pricing: MockPricingProvider,
    fees: MockFeeProvider,
    catalog: InMemoryCatalogStore,
    results: Arc<InMemoryResultStore>,
) -> ScanService {
    ScanService::new(
        Arc::new(pricing),
        Arc::new(fees),
        Arc::new(catalog),
        results,
        test_settings(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scan() {
    common::init_tracing();
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        Arc::clone(&results),
    );

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    // Exactly one opportunity, for the deduplicated identifier, carrying
    // both source groups
    let opportunities: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Opportunity { opportunity } => Some(opportunity),
            _ => None,
        })
        .collect();
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].identifier, "A1");
    assert_eq!(opportunities[0].source_groups, vec!["sf-1", "sf-2"]);
    assert_eq!(opportunities[0].best_marketplace, de());

    // The stream terminates with a complete event whose counters match
    let last = events.last().expect("stream not empty");
    match last {
        ProgressEvent::Complete { counters, .. } => {
            assert_eq!(counters.total_units, 4);
            assert_eq!(counters.deduplicated_units, 3);
            assert_eq!(counters.processed, 3);
            assert_eq!(counters.found, opportunities.len() as u32);
        }
        other => panic!("expected complete event, got {other:?}"),
    }

    // Persisted state agrees with the stream
    let snapshot = service.status(&scan_id).await.expect("status");
    assert_eq!(snapshot.record.status, ScanStatus::Completed);
    assert!(snapshot.record.completed_at.is_some());
    assert_eq!(snapshot.record.counters.processed, 3);
    assert_eq!(snapshot.opportunities.len(), 1);
    assert_eq!(results.opportunities(&scan_id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_progress_percent_is_monotonic() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        results,
    );

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let events = handle.events.collect().await;

    let mut last_percent = 0u8;
    let mut saw_progress = false;
    for event in &events {
        if let ProgressEvent::Progress { percent, .. } = event {
            saw_progress = true;
            assert!(
                *percent >= last_percent,
                "percent decreased from {last_percent} to {percent}"
            );
            last_percent = *percent;
        }
    }
    assert!(saw_progress);
    assert_eq!(last_percent, 100);
}

#[tokio::test(start_paused = true)]
async fn test_empty_catalog_is_fatal() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        InMemoryCatalogStore::new(Vec::new()),
        Arc::clone(&results),
    );

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    let last = events.last().expect("stream not empty");
    assert!(matches!(last, ProgressEvent::Error { .. }));

    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.status, ScanStatus::Failed);
    assert!(record
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("no viable catalog input")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_foreign_marketplace_degrades_to_no_data() {
    let results = Arc::new(InMemoryResultStore::new());
    let pricing = test_pricing().with_failing_marketplace(&de());
    let service = service(pricing, MockFeeProvider::new(), test_catalog(), Arc::clone(&results));

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    // No foreign data means no opportunities, but the scan still completes
    // and every unit is processed
    assert!(matches!(
        events.last().expect("stream not empty"),
        ProgressEvent::Complete { .. }
    ));
    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.counters.processed, 3);
    assert_eq!(record.counters.found, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fee_failure_skips_unit_but_advances() {
    let results = Arc::new(InMemoryResultStore::new());
    let fees = MockFeeProvider::new().with_failing_identifier("A1");
    let service = service(test_pricing(), fees, test_catalog(), Arc::clone(&results));

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    assert!(matches!(
        events.last().expect("stream not empty"),
        ProgressEvent::Complete { .. }
    ));
    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.counters.processed, 3);
    // A1 was the only profitable unit, and its fee call failed
    assert_eq!(record.counters.found, 0);
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_is_fatal() {
    let results = Arc::new(InMemoryResultStore::new());
    results.fail_inserts();
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        Arc::clone(&results),
    );

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    let last = events.last().expect("stream not empty");
    assert!(matches!(last, ProgressEvent::Error { .. }));
    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.status, ScanStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_is_a_distinct_terminal_state() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        Arc::clone(&results),
    );

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();

    // Cancel before the orchestrator reaches its first batch check
    handle.cancel();
    let events = handle.events.collect().await;

    match events.last().expect("stream not empty") {
        ProgressEvent::Error { message } => assert!(message.contains("cancelled")),
        other => panic!("expected error terminal event, got {other:?}"),
    }

    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.status, ScanStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_throttled_pricing_call_recovers_via_retry() {
    let results = Arc::new(InMemoryResultStore::new());
    let pricing = test_pricing().with_throttled_calls(1);
    let service = service(pricing, MockFeeProvider::new(), test_catalog(), Arc::clone(&results));

    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    assert!(matches!(
        events.last().expect("stream not empty"),
        ProgressEvent::Complete { .. }
    ));
    let record = results.scan(&scan_id).expect("scan persisted");
    assert_eq!(record.counters.found, 1);
}

#[tokio::test(start_paused = true)]
async fn test_quota_spacing_is_respected_end_to_end() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        results,
    );

    let started = Instant::now();
    let handle = service
        .start_scan("user-1", ScanScope::AllStorefronts)
        .await
        .expect("start scan");
    handle.events.collect().await;
    let elapsed = Instant::now() - started;

    // Two batches, two marketplaces each: four pricing grants at >= 20ms
    // spacing plus fee grants at >= 10ms spacing and the inter-batch pacing
    // floor make anything under 60ms a quota violation.
    assert!(
        elapsed >= Duration::from_millis(60),
        "scan finished in {elapsed:?}, too fast for the configured quotas"
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_identifier_scope() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        Arc::clone(&results),
    );

    let handle = service
        .start_scan(
            "user-1",
            ScanScope::Identifiers {
                identifiers: vec!["A1".to_string()],
            },
        )
        .await
        .expect("start scan");
    let scan_id = handle.scan_id.clone();
    let events = handle.events.collect().await;

    assert!(matches!(
        events.last().expect("stream not empty"),
        ProgressEvent::Complete { .. }
    ));
    let opportunities = results.opportunities(&scan_id);
    assert_eq!(opportunities.len(), 1);
    // Synthesized rows carry no display name; the identifier stands in
    assert_eq!(opportunities[0].display_name, "A1");
}

#[tokio::test(start_paused = true)]
async fn test_status_for_unknown_scan_is_not_found() {
    let results = Arc::new(InMemoryResultStore::new());
    let service = service(
        test_pricing(),
        MockFeeProvider::new(),
        test_catalog(),
        results,
    );

    let result = service.status("scan-missing").await;
    assert!(matches!(
        result,
        Err(flipscope_engine::ScanError::NotFound(_))
    ));
}
