//! Flipscope Core - Shared domain model and contracts.
//!
//! This crate provides the types shared across the Flipscope workspace:
//! the sourcing domain model (marketplaces, price observations, fee
//! estimates, opportunities), scan records and counters, the store traits
//! the engine is wired against, TOML configuration, and the central error
//! type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ConfigError, FlipscopeError, Result, StoreError, StoreResult};
pub use store::{CatalogStore, ResultStore, ScanPatch};
pub use types::{
    FeeComponent, FeeEstimate, MarketplaceCode, MarketplaceEntry, MarketplacePriceMap,
    Opportunity, PriceObservation, ProductRow, ProductUnit, ProfitCategory, ScanCounters,
    ScanRecord, ScanScope, ScanStatus,
};
