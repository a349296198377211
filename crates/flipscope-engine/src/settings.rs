//! Validated runtime settings for the scan engine.
//!
//! [`ScanSettings`] is the engine's view of the TOML [`AppConfig`]: codes
//! parsed into [`MarketplaceCode`], intervals into [`Duration`], and the
//! cross-field constraints checked once at construction instead of on every
//! scan.

use crate::quota::EndpointQuota;
use flipscope_core::config::{AppConfig, EndpointQuotaConfig, ProfitConfig};
use flipscope_core::{FlipscopeError, MarketplaceCode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// Validated engine settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Home marketplace (where items are resold)
    pub home: MarketplaceCode,
    /// Foreign marketplaces in scan order
    pub foreign: Vec<MarketplaceCode>,
    /// Fixed exchange rates into the home currency, keyed by marketplace
    pub exchange_rates: HashMap<MarketplaceCode, Decimal>,
    /// Maximum identifiers per pricing call
    pub batch_size: usize,
    /// Pricing endpoint quota
    pub pricing_quota: EndpointQuota,
    /// Fee endpoint quota
    pub fees_quota: EndpointQuota,
    /// Cooldown before the single pricing retry
    pub pricing_cooldown: Duration,
    /// Cooldown before the single fee retry
    pub fees_cooldown: Duration,
    /// Profit computation policy
    pub profit: ProfitConfig,
}

impl ScanSettings {
    /// Build validated settings from the application configuration.
    ///
    /// # Errors
    /// Returns a validation error when a marketplace code is malformed, the
    /// home marketplace appears in the foreign list, the batch size is zero,
    /// or a retry cooldown does not exceed its gate interval.
    pub fn from_config(config: &AppConfig) -> Result<Self, FlipscopeError> {
        let home = MarketplaceCode::new(&config.marketplaces.home)?;

        let mut foreign = Vec::with_capacity(config.marketplaces.foreign.len());
        for code in &config.marketplaces.foreign {
            let code = MarketplaceCode::new(code)?;
            if code == home {
                return Err(FlipscopeError::Validation(format!(
                    "home marketplace {home} must not appear in the foreign list"
                )));
            }
            if !foreign.contains(&code) {
                foreign.push(code);
            }
        }

        if foreign.is_empty() {
            return Err(FlipscopeError::Validation(
                "at least one foreign marketplace is required".to_string(),
            ));
        }

        if config.scanning.batch_size == 0 {
            return Err(FlipscopeError::Validation(
                "scanning.batch_size must be at least 1".to_string(),
            ));
        }

        let mut exchange_rates = HashMap::new();
        for (code, rate) in &config.marketplaces.exchange_rates {
            exchange_rates.insert(MarketplaceCode::new(code)?, *rate);
        }

        let (pricing_quota, pricing_cooldown) = endpoint_settings("pricing", &config.quota.pricing)?;
        let (fees_quota, fees_cooldown) = endpoint_settings("fees", &config.quota.fees)?;

        Ok(Self {
            home,
            foreign,
            exchange_rates,
            batch_size: config.scanning.batch_size,
            pricing_quota,
            fees_quota,
            pricing_cooldown,
            fees_cooldown,
            profit: config.profit.clone(),
        })
    }
}

fn endpoint_settings(
    name: &str,
    config: &EndpointQuotaConfig,
) -> Result<(EndpointQuota, Duration), FlipscopeError> {
    if config.retry_cooldown_ms <= config.min_interval_ms {
        return Err(FlipscopeError::Validation(format!(
            "quota.{name}.retry_cooldown_ms ({}) must exceed min_interval_ms ({})",
            config.retry_cooldown_ms, config.min_interval_ms
        )));
    }

    Ok((
        EndpointQuota::new(Duration::from_millis(config.min_interval_ms), config.burst),
        Duration::from_millis(config.retry_cooldown_ms),
    ))
}
