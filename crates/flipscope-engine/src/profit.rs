//! Profit, margin, and ROI computation.
//!
//! Exchange rates are fixed, injected configuration values; they are not
//! fetched live, and the operator must keep them current.

use flipscope_core::config::{ProfitConfig, ServiceFeeBasis};
use flipscope_core::{
    FeeEstimate, MarketplaceCode, MarketplaceEntry, MarketplacePriceMap, Opportunity,
    ProductUnit, ProfitCategory,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Computes opportunities from aggregated price data and fee estimates.
#[derive(Debug, Clone)]
pub struct ProfitCalculator {
    home: MarketplaceCode,
    exchange_rates: HashMap<MarketplaceCode, Decimal>,
    service_fee_percent: Decimal,
    service_fee_basis: ServiceFeeBasis,
    inclusion_threshold: Decimal,
}

impl ProfitCalculator {
    /// Create a calculator for one home marketplace.
    #[must_use]
    pub fn new(
        home: MarketplaceCode,
        exchange_rates: HashMap<MarketplaceCode, Decimal>,
        policy: &ProfitConfig,
    ) -> Self {
        Self {
            home,
            exchange_rates,
            service_fee_percent: policy.service_fee_percent,
            service_fee_basis: policy.service_fee_basis,
            inclusion_threshold: policy.inclusion_threshold,
        }
    }

    /// Compute an opportunity for one unit, or `None` when there is nothing
    /// viable.
    ///
    /// `None` is the expected outcome for units without a positive home
    /// price and for units where no foreign marketplace clears the inclusion
    /// threshold. It is not an error.
    #[must_use]
    pub fn compute(
        &self,
        unit: &ProductUnit,
        prices: &MarketplacePriceMap,
        fees: &FeeEstimate,
    ) -> Option<Opportunity> {
        let home_observation = prices.get(&self.home)?;
        let home_price = home_observation.amount;
        if home_price <= Decimal::ZERO {
            return None;
        }

        let service_fee = self.service_fee(home_price, fees);

        // Deterministic entry order: marketplace code ascending
        let mut foreign: Vec<&MarketplaceCode> =
            prices.keys().filter(|code| **code != self.home).collect();
        foreign.sort();

        let mut entries = Vec::new();
        for code in foreign {
            let observation = &prices[code];
            if observation.amount <= Decimal::ZERO {
                continue;
            }

            let Some(rate) = self.exchange_rates.get(code) else {
                tracing::debug!(marketplace = %code, "No exchange rate configured, skipping");
                continue;
            };

            let converted = observation.amount * rate;
            if converted <= Decimal::ZERO {
                continue;
            }

            let total_cost = converted + fees.total + service_fee;
            let profit = home_price - total_cost;

            if profit <= self.inclusion_threshold {
                continue;
            }

            entries.push(MarketplaceEntry {
                marketplace: code.clone(),
                source_price: observation.amount,
                source_price_home: converted,
                total_cost,
                profit,
                margin: profit / home_price,
                roi: profit / converted,
            });
        }

        if entries.is_empty() {
            return None;
        }

        let best = select_best(&entries);
        let category = ProfitCategory::classify(best.profit);
        let best_marketplace = best.marketplace.clone();

        Some(Opportunity {
            identifier: unit.identifier.clone(),
            display_name: unit.display_name.clone(),
            image_ref: unit.image_ref.clone(),
            source_groups: unit.source_groups.clone(),
            sales_rank: unit.sales_rank.or(home_observation.sales_rank),
            home_marketplace: self.home.clone(),
            home_price,
            fees: fees.clone(),
            entries,
            best_marketplace,
            category,
            discovered_at: chrono::Utc::now(),
        })
    }

    fn service_fee(&self, home_price: Decimal, fees: &FeeEstimate) -> Decimal {
        let basis = match self.service_fee_basis {
            ServiceFeeBasis::SalePrice => home_price,
            ServiceFeeBasis::TotalFees => fees.total,
        };
        basis * self.service_fee_percent / Decimal::from(100)
    }
}

/// Select the best entry: highest ROI, ties broken by higher absolute
/// profit, then by marketplace code ascending for determinism. ROI rather
/// than raw profit, since ROI reflects capital efficiency for sourcing.
fn select_best(entries: &[MarketplaceEntry]) -> &MarketplaceEntry {
    entries
        .iter()
        .max_by(|a, b| {
            a.roi
                .cmp(&b.roi)
                .then(a.profit.cmp(&b.profit))
                .then(b.marketplace.cmp(&a.marketplace))
        })
        .expect("select_best called with non-empty entries")
}
