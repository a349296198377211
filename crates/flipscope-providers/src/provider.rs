//! Core provider traits.
//!
//! The scan engine depends only on these seams; concrete HTTP clients and
//! in-memory mocks both implement them.

use crate::error::Result;
use async_trait::async_trait;
use flipscope_core::{FeeEstimate, MarketplaceCode, PriceObservation};
use rust_decimal::Decimal;

/// Trait for the batch pricing endpoint.
///
/// Implementations must be thread-safe (Send + Sync) for use in async
/// contexts. The engine issues at most one in-flight call per endpoint class;
/// implementations do not need to rate-limit themselves.
#[async_trait]
pub trait PricingProvider: Send + Sync {
    /// Fetch price observations for up to the endpoint's per-call limit of
    /// identifiers in one marketplace.
    ///
    /// Identifiers with no offer in the marketplace are simply absent from
    /// the response; that is a valid state, not an error.
    ///
    /// # Errors
    /// Returns [`crate::ProviderError::Throttled`] when the endpoint signals
    /// a quota violation; other failures map to the remaining variants.
    async fn prices(
        &self,
        identifiers: &[String],
        marketplace: &MarketplaceCode,
    ) -> Result<Vec<PriceObservation>>;
}

/// Trait for the fee-estimate endpoint.
#[async_trait]
pub trait FeeProvider: Send + Sync {
    /// Estimate marketplace fees for selling one identifier at `home_price`
    /// in the home marketplace.
    ///
    /// # Errors
    /// Same throttling contract as [`PricingProvider::prices`].
    async fn fee_estimate(
        &self,
        identifier: &str,
        home_price: Decimal,
        home_marketplace: &MarketplaceCode,
    ) -> Result<FeeEstimate>;
}
