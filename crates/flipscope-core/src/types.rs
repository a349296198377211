//! Shared types used across the Flipscope application.
//!
//! This module defines the domain model for cross-marketplace sourcing:
//! marketplace codes, catalog rows, price observations, fee estimates, and
//! the opportunity records produced by a scan.

use crate::error::FlipscopeError;
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Newtype for marketplace codes with validation.
///
/// Marketplace codes are 2-4 uppercase ASCII alphanumerics (e.g. "US", "DE",
/// "UK", "JP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketplaceCode(String);

impl MarketplaceCode {
    /// Create a new `MarketplaceCode` from a string.
    ///
    /// # Errors
    /// Returns error if the code is not 2-4 uppercase ASCII alphanumerics.
    pub fn new(code: impl Into<String>) -> Result<Self, FlipscopeError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate marketplace code format: 2-4 uppercase alphanumerics.
    fn validate(code: &str) -> Result<(), FlipscopeError> {
        static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            CODE_REGEX.get_or_init(|| Regex::new(r"^[A-Z0-9]{2,4}$").expect("valid regex"));

        if regex.is_match(code) {
            Ok(())
        } else {
            Err(FlipscopeError::Validation(format!(
                "invalid marketplace code: must be 2-4 uppercase alphanumerics, got '{code}'"
            )))
        }
    }
}

impl fmt::Display for MarketplaceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One raw catalog row as read from a storefront listing.
///
/// Rows are the unit of catalog storage; the scan engine collapses rows that
/// share an identifier into a single [`ProductUnit`] before scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    /// Marketplace catalog identifier for the product
    pub identifier: String,
    /// Display name, if the listing carried one
    pub display_name: Option<String>,
    /// Image reference (URL or storage key)
    pub image_ref: Option<String>,
    /// Known sales rank / velocity signal, if any
    pub sales_rank: Option<u64>,
    /// Source group (storefront) this row originated from
    pub source_group_id: Option<String>,
}

/// One deduplicated sourcing target.
///
/// Created once per scan from raw catalog rows and immutable for the
/// duration of that scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUnit {
    /// Marketplace catalog identifier
    pub identifier: String,
    /// Display name (falls back to the identifier when the rows carried none)
    pub display_name: String,
    /// Image reference, if any row carried one
    pub image_ref: Option<String>,
    /// Known sales rank / velocity signal, if any
    pub sales_rank: Option<u64>,
    /// Originating source groups, unique, in first-seen order. Non-empty for
    /// rows that carried a group; rows without a group yield an empty list.
    pub source_groups: Vec<String>,
}

/// One marketplace's quoted price for one identifier at one point in time.
///
/// Produced by the pricing endpoint and held only for the current scan pass;
/// never persisted standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Catalog identifier this observation belongs to
    pub identifier: String,
    /// Marketplace the price was observed in
    pub marketplace: MarketplaceCode,
    /// Quoted amount in the marketplace's currency
    pub amount: Decimal,
    /// ISO currency code of `amount`
    pub currency: String,
    /// Number of competing offers
    pub offer_count: u32,
    /// Rank signal reported alongside the price, if any
    pub sales_rank: Option<u64>,
    /// Whether this observation is the primary competitive (buy-box) price
    pub buy_box: bool,
}

/// Mapping from marketplace code to the selected price observation for a
/// single product.
///
/// At most one observation per marketplace; absence means "no offer found",
/// not a zero price.
pub type MarketplacePriceMap = HashMap<MarketplaceCode, PriceObservation>;

/// One itemized fee component in a fee estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeComponent {
    /// Fee component name (e.g. "referral", "fulfillment")
    pub name: String,
    /// Component amount in home-marketplace currency
    pub amount: Decimal,
}

/// Marketplace fee estimate for selling one identifier at a given home price.
///
/// Fees depend only on the home price, so one estimate per product per scan
/// pass suffices regardless of the source marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Total of all fees
    pub total: Decimal,
    /// Referral fee component of the total
    pub referral: Decimal,
    /// Remaining itemized components
    pub components: Vec<FeeComponent>,
}

/// Per-foreign-marketplace result attached to an [`Opportunity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceEntry {
    /// Source marketplace being evaluated
    pub marketplace: MarketplaceCode,
    /// Price in the source marketplace's currency
    pub source_price: Decimal,
    /// Source price converted to home-marketplace currency
    pub source_price_home: Decimal,
    /// Landed cost: converted source price + fees + service fee
    pub total_cost: Decimal,
    /// Home price minus total cost
    pub profit: Decimal,
    /// Profit divided by home price
    pub margin: Decimal,
    /// Profit divided by the converted source price (capital efficiency)
    pub roi: Decimal,
}

/// Profit classification derived from the best entry's absolute profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitCategory {
    /// Profit at or above the high threshold
    High,
    /// Profit at or above the medium threshold
    Medium,
    /// Profit at or above the low threshold
    Low,
    /// Positive profit below the low threshold
    Marginal,
    /// Zero or negative profit (possible under a negative inclusion tolerance)
    Loss,
}

impl ProfitCategory {
    /// Classify an absolute profit (home currency) using fixed thresholds.
    #[must_use]
    pub fn classify(profit: Decimal) -> Self {
        if profit >= Decimal::from(15) {
            Self::High
        } else if profit >= Decimal::from(7) {
            Self::Medium
        } else if profit >= Decimal::from(2) {
            Self::Low
        } else if profit > Decimal::ZERO {
            Self::Marginal
        } else {
            Self::Loss
        }
    }
}

impl fmt::Display for ProfitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Marginal => write!(f, "marginal"),
            Self::Loss => write!(f, "loss"),
        }
    }
}

/// The output unit of a scan: a profitable sourcing opportunity.
///
/// Created by the profit calculator, persisted immediately, immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Catalog identifier
    pub identifier: String,
    /// Display name of the product
    pub display_name: String,
    /// Image reference, if known
    pub image_ref: Option<String>,
    /// Originating source groups of the deduplicated unit
    pub source_groups: Vec<String>,
    /// Sales rank signal, if known
    pub sales_rank: Option<u64>,
    /// Home marketplace the item would be resold in
    pub home_marketplace: MarketplaceCode,
    /// Resale price in the home marketplace
    pub home_price: Decimal,
    /// Fee breakdown at the home price
    pub fees: FeeEstimate,
    /// Viable foreign marketplaces, ordered by marketplace code
    pub entries: Vec<MarketplaceEntry>,
    /// Marketplace code of the best entry (highest ROI)
    pub best_marketplace: MarketplaceCode,
    /// Profit classification of the best entry
    pub category: ProfitCategory,
    /// When the opportunity was discovered
    pub discovered_at: DateTime<Utc>,
}

impl Opportunity {
    /// Get the best entry (the one designated by `best_marketplace`).
    ///
    /// Returns `None` only for records whose entry list was corrupted in
    /// storage; freshly computed opportunities always carry their best entry.
    #[must_use]
    pub fn best_entry(&self) -> Option<&MarketplaceEntry> {
        self.entries
            .iter()
            .find(|e| e.marketplace == self.best_marketplace)
    }
}

/// Scope of a scan: which part of the catalog to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanScope {
    /// A single storefront's catalog
    Storefront {
        /// Storefront identifier
        storefront_id: String,
    },
    /// A selected set of storefronts
    Storefronts {
        /// Storefront identifiers
        storefront_ids: Vec<String>,
    },
    /// Every storefront owned by the user
    AllStorefronts,
    /// An explicit identifier list, bypassing storefront catalogs
    Identifiers {
        /// Catalog identifiers to scan
        identifiers: Vec<String>,
    },
}

/// Lifecycle state of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    /// Scan is currently in progress
    Running,
    /// Scan completed successfully
    Completed,
    /// Scan failed with an error
    Failed,
    /// Scan was cancelled by the caller
    Cancelled,
}

impl ScanStatus {
    /// Whether this status is terminal (no further mutation permitted).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Parse from string representation, defaulting unknown values to
    /// `Running` the way the stored text was written by [`fmt::Display`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            _ => Self::Running,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Counters accumulated over one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounters {
    /// Raw catalog rows resolved for the scope
    pub total_units: u32,
    /// Units remaining after deduplication
    pub deduplicated_units: u32,
    /// Units processed so far
    pub processed: u32,
    /// Opportunities found so far
    pub found: u32,
}

/// A scan record as persisted by the result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for the scan
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Catalog scope the scan covers
    pub scope: ScanScope,
    /// Lifecycle state
    pub status: ScanStatus,
    /// Progress counters
    pub counters: ScanCounters,
    /// When the scan started
    pub started_at: DateTime<Utc>,
    /// When the scan reached a terminal state, if it has
    pub completed_at: Option<DateTime<Utc>>,
    /// Terminal error message, if the scan failed
    pub error_message: Option<String>,
}
