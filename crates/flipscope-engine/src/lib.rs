//! Flipscope Engine - Cross-marketplace scan orchestration.
//!
//! This crate drives one scan from catalog load to terminal state: it
//! deduplicates the product set, paces two independently rate-limited
//! external services through a per-class quota gate with bounded retry,
//! aggregates per-marketplace prices, computes profit and ROI, persists
//! each opportunity as it is discovered, and emits an ordered progress
//! event stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use flipscope_engine::{ScanService, ScanSettings};
//! use flipscope_core::{AppConfig, ScanScope};
//! use std::sync::Arc;
//!
//! let settings = ScanSettings::from_config(&AppConfig::load_with_env()?)?;
//! let service = ScanService::new(pricing, fees, catalog, results, settings);
//!
//! let mut handle = service.start_scan(&user_id, ScanScope::AllStorefronts).await?;
//! while let Some(event) = handle.events.next_event().await {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod aggregate;
pub mod caller;
pub mod dedupe;
pub mod error;
pub mod orchestrator;
pub mod profit;
pub mod progress;
pub mod quota;
pub mod service;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use aggregate::aggregate;
pub use caller::RetryingCaller;
pub use dedupe::dedupe;
pub use error::{Result, ScanError};
pub use orchestrator::ScanOrchestrator;
pub use profit::ProfitCalculator;
pub use progress::{progress_channel, ProgressEvent, ProgressSender, ProgressStream};
pub use quota::{EndpointClass, EndpointQuota, QuotaGate};
pub use service::{ScanHandle, ScanService, ScanSnapshot};
pub use session::ScanSession;
pub use settings::ScanSettings;
