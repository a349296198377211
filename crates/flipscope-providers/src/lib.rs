//! Flipscope Providers - External pricing and fee service clients.
//!
//! This crate defines the provider seams the scan engine is wired against
//! and ships two kinds of implementations: reqwest-backed HTTP clients for
//! the real endpoints, and scriptable mocks for tests and development.
//!
//! Rate limiting is deliberately absent here: the engine's quota gate owns
//! pacing, and providers surface throttling responses as
//! [`ProviderError::Throttled`] for the retrying caller to classify.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod fees;
pub mod mock;
pub mod pricing;
pub mod provider;

// Re-export commonly used types
pub use error::{ProviderError, Result};
pub use fees::HttpFeeProvider;
pub use mock::{MockFeeProvider, MockPricingProvider};
pub use pricing::HttpPricingProvider;
pub use provider::{FeeProvider, PricingProvider};
