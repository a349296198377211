//! Mock providers for testing and development.
//!
//! Both mocks are scriptable: observations are loaded up front, individual
//! marketplaces or identifiers can be made to fail, and the next N calls can
//! be made to return a throttling error to exercise retry paths.

use crate::error::{ProviderError, Result};
use crate::provider::{FeeProvider, PricingProvider};
use async_trait::async_trait;
use flipscope_core::{FeeComponent, FeeEstimate, MarketplaceCode, PriceObservation};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Mock pricing provider serving preloaded observations.
#[derive(Debug, Default)]
pub struct MockPricingProvider {
    observations: Mutex<HashMap<String, Vec<PriceObservation>>>,
    failing: Mutex<HashSet<String>>,
    throttle_remaining: AtomicU32,
    calls: AtomicU32,
}

impl MockPricingProvider {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload one observation; its marketplace field decides which
    /// marketplace response it appears in.
    #[must_use]
    pub fn with_observation(self, observation: PriceObservation) -> Self {
        self.observations
            .lock()
            .expect("observations lock")
            .entry(observation.marketplace.as_str().to_string())
            .or_default()
            .push(observation);
        self
    }

    /// Make every call for `marketplace` fail with an API error.
    #[must_use]
    pub fn with_failing_marketplace(self, marketplace: &MarketplaceCode) -> Self {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(marketplace.as_str().to_string());
        self
    }

    /// Make the next `n` calls fail with a throttling error.
    #[must_use]
    pub fn with_throttled_calls(self, n: u32) -> Self {
        self.throttle_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PricingProvider for MockPricingProvider {
    async fn prices(
        &self,
        identifiers: &[String],
        marketplace: &MarketplaceCode,
    ) -> Result<Vec<PriceObservation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .throttle_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::Throttled {
                endpoint: "pricing".to_string(),
                message: "scripted throttle".to_string(),
            });
        }

        if self
            .failing
            .lock()
            .expect("failing lock")
            .contains(marketplace.as_str())
        {
            return Err(ProviderError::Api {
                endpoint: "pricing".to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            });
        }

        let requested: HashSet<&str> = identifiers.iter().map(String::as_str).collect();
        let observations = self.observations.lock().expect("observations lock");
        Ok(observations
            .get(marketplace.as_str())
            .map(|all| {
                all.iter()
                    .filter(|obs| requested.contains(obs.identifier.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Mock fee provider computing a referral percentage plus a flat closing fee,
/// with optional per-identifier overrides.
#[derive(Debug)]
pub struct MockFeeProvider {
    overrides: Mutex<HashMap<String, FeeEstimate>>,
    failing: Mutex<HashSet<String>>,
    throttle_remaining: AtomicU32,
    calls: AtomicU32,
    referral_percent: Decimal,
    closing_fee: Decimal,
}

impl Default for MockFeeProvider {
    fn default() -> Self {
        Self {
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            throttle_remaining: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            referral_percent: Decimal::from(15),
            closing_fee: Decimal::new(180, 2),
        }
    }
}

impl MockFeeProvider {
    /// Create a mock with the default 15% referral + 1.80 closing fee.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed estimate for one identifier instead of the formula.
    #[must_use]
    pub fn with_estimate(self, identifier: impl Into<String>, estimate: FeeEstimate) -> Self {
        self.overrides
            .lock()
            .expect("overrides lock")
            .insert(identifier.into(), estimate);
        self
    }

    /// Make every call for `identifier` fail with an API error.
    #[must_use]
    pub fn with_failing_identifier(self, identifier: impl Into<String>) -> Self {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(identifier.into());
        self
    }

    /// Make the next `n` calls fail with a throttling error.
    #[must_use]
    pub fn with_throttled_calls(self, n: u32) -> Self {
        self.throttle_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeeProvider for MockFeeProvider {
    async fn fee_estimate(
        &self,
        identifier: &str,
        home_price: Decimal,
        _home_marketplace: &MarketplaceCode,
    ) -> Result<FeeEstimate> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .throttle_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::Throttled {
                endpoint: "fees".to_string(),
                message: "scripted throttle".to_string(),
            });
        }

        if self
            .failing
            .lock()
            .expect("failing lock")
            .contains(identifier)
        {
            return Err(ProviderError::Api {
                endpoint: "fees".to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            });
        }

        if let Some(estimate) = self
            .overrides
            .lock()
            .expect("overrides lock")
            .get(identifier)
        {
            return Ok(estimate.clone());
        }

        let referral = (home_price * self.referral_percent / Decimal::from(100)).round_dp(2);
        let total = referral + self.closing_fee;
        Ok(FeeEstimate {
            total,
            referral,
            components: vec![
                FeeComponent {
                    name: "referral".to_string(),
                    amount: referral,
                },
                FeeComponent {
                    name: "closing".to_string(),
                    amount: self.closing_fee,
                },
            ],
        })
    }
}

/// Build a price observation for tests.
#[must_use]
pub fn observation(
    identifier: &str,
    marketplace: &MarketplaceCode,
    amount: Decimal,
    currency: &str,
    buy_box: bool,
) -> PriceObservation {
    PriceObservation {
        identifier: identifier.to_string(),
        marketplace: marketplace.clone(),
        amount,
        currency: currency.to_string(),
        offer_count: 1,
        sales_rank: None,
        buy_box,
    }
}
