//! Configuration management for Flipscope.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration.
///
/// This is loaded from `~/.config/flipscope/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Marketplace topology and exchange rates
    pub marketplaces: MarketplacesConfig,
    /// Per-endpoint-class quota settings
    pub quota: QuotaConfig,
    /// Scan batching behavior
    pub scanning: ScanningConfig,
    /// Profit computation policy
    pub profit: ProfitConfig,
    /// External provider endpoints
    pub providers: ProvidersConfig,
    /// Local database settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `FLIPSCOPE_HOME_MARKETPLACE`: Override the home marketplace code
    /// - `FLIPSCOPE_BATCH_SIZE`: Override the pricing batch size
    /// - `FLIPSCOPE_DB_PATH`: Override the database file path
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("FLIPSCOPE_HOME_MARKETPLACE") {
            if !val.is_empty() {
                tracing::debug!("Override marketplaces.home from env: {}", val);
                config.marketplaces.home = val;
            }
        }

        if let Ok(val) = std::env::var("FLIPSCOPE_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                tracing::debug!("Override scanning.batch_size from env: {}", size);
                config.scanning.batch_size = size;
            }
        }

        if let Ok(val) = std::env::var("FLIPSCOPE_DB_PATH") {
            if !val.is_empty() {
                tracing::debug!("Override database.path from env: {}", val);
                config.database.path = val;
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/flipscope/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "flipscope", "flipscope").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/flipscope`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "flipscope", "flipscope").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Marketplace topology: where to resell and where to source from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplacesConfig {
    /// Home marketplace code (where items are resold)
    pub home: String,
    /// Foreign marketplaces evaluated as sources, in scan order
    pub foreign: Vec<String>,
    /// Fixed exchange rates from each foreign marketplace's currency into the
    /// home currency. Rates are configuration values, not fetched live; the
    /// operator is responsible for keeping them current.
    pub exchange_rates: HashMap<String, Decimal>,
}

impl Default for MarketplacesConfig {
    fn default() -> Self {
        let mut exchange_rates = HashMap::new();
        for (code, rate) in [("UK", "1.27"), ("DE", "1.08"), ("FR", "1.08"), ("IT", "1.08")] {
            exchange_rates.insert(
                code.to_string(),
                Decimal::from_str(rate).expect("valid default rate"),
            );
        }

        Self {
            home: "US".to_string(),
            foreign: vec![
                "UK".to_string(),
                "DE".to_string(),
                "FR".to_string(),
                "IT".to_string(),
            ],
            exchange_rates,
        }
    }
}

/// Quota settings for one endpoint class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointQuotaConfig {
    /// Minimum interval between request grants in milliseconds
    pub min_interval_ms: u64,
    /// Burst capacity (grants available without spacing); 1 = strict spacing
    pub burst: u32,
    /// Cooldown before the single retry after a throttling response, in
    /// milliseconds. Must exceed `min_interval_ms`.
    pub retry_cooldown_ms: u64,
}

impl Default for EndpointQuotaConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            burst: 1,
            retry_cooldown_ms: 2000,
        }
    }
}

/// Per-endpoint-class quota settings.
///
/// The pricing endpoint's official quota is near one request every two
/// seconds with no burst tolerance; the fee endpoint allows one per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Pricing endpoint quota
    pub pricing: EndpointQuotaConfig,
    /// Fee endpoint quota
    pub fees: EndpointQuotaConfig,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            pricing: EndpointQuotaConfig {
                min_interval_ms: 2000,
                burst: 1,
                retry_cooldown_ms: 5000,
            },
            fees: EndpointQuotaConfig {
                min_interval_ms: 1000,
                burst: 2,
                retry_cooldown_ms: 2000,
            },
        }
    }
}

/// Scan batching behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Maximum identifiers per pricing call (the endpoint's per-call limit)
    pub batch_size: usize,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self { batch_size: 20 }
    }
}

/// Basis for the variable service fee percentage.
///
/// Source systems computed this inconsistently; the basis is an explicit
/// configuration choice here and the default is the sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFeeBasis {
    /// Percentage of the home sale price
    SalePrice,
    /// Percentage of the total marketplace fees
    TotalFees,
}

/// Profit computation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitConfig {
    /// Variable service fee percentage (e.g. 2 = 2%)
    pub service_fee_percent: Decimal,
    /// What the service fee percentage applies to
    pub service_fee_basis: ServiceFeeBasis,
    /// Profit must exceed this threshold (home currency) for a foreign
    /// marketplace to be included. Zero means strictly-positive profit; a
    /// small negative value shows near-miss break-even deals.
    pub inclusion_threshold: Decimal,
}

impl Default for ProfitConfig {
    fn default() -> Self {
        Self {
            service_fee_percent: Decimal::from(2),
            service_fee_basis: ServiceFeeBasis::SalePrice,
            inclusion_threshold: Decimal::ZERO,
        }
    }
}

/// External provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Base URL of the pricing endpoint
    pub pricing_url: String,
    /// Base URL of the fee-estimate endpoint
    pub fees_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key for both endpoints (not persisted to the config file)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            pricing_url: "https://pricing.flipscope.dev/v1".to_string(),
            fees_url: "https://fees.flipscope.dev/v1".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Local database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (or `:memory:`)
    pub path: String,
    /// Maximum pool connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "flipscope.db".to_string(),
            max_connections: 5,
        }
    }
}
