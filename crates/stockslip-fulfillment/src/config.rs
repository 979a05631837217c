//! # Engine Configuration
//!
//! Configuration for the fulfillment engine and the database it runs on.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKSLIP_DB_PATH=/srv/stockslip.db                                │
//! │     STOCKSLIP_RESOLUTION_POLICY=strict                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockslip/stockslip.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockslip.stockslip/...  (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     first_match resolution, 10 s request timeout, bulk 10 × 10.00     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockslip.toml
//! log_filter = "info,stockslip_db=debug"
//!
//! [database]
//! path = "/srv/stockslip/stockslip.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [pricing]
//! bulk_threshold = 10
//! bulk_discount_cents = 1000
//! bulk_cover_types = ["Aster Cover", "Without Aster Cover", "Calendar Cover"]
//!
//! [engine]
//! resolution_policy = "first_match"   # first_match | strict
//! request_timeout_ms = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockslip_core::pricing::PricingRules;
use stockslip_core::MAX_PRICE_CENTS;
use stockslip_db::{DbConfig, ResolutionPolicy};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long a writer waits for the SQLite write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("stockslip.db"))
        .unwrap_or_else(|| PathBuf::from("stockslip.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// How a line reference matching several items is settled.
    #[serde(default)]
    pub resolution_policy: ResolutionPolicy,

    /// Upper bound on one create / edit / cancel, including lock waits.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            resolution_policy: ResolutionPolicy::default(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl EngineSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingRules,

    #[serde(default)]
    pub engine: EngineSettings,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_filter: default_log_filter(),
            database: DatabaseSettings::default(),
            pricing: PricingRules::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockslip.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.engine.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.request_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.pricing.bulk_threshold < 1 {
            return Err(ConfigError::Invalid(
                "pricing.bulk_threshold must be at least 1".into(),
            ));
        }

        if !(0..=MAX_PRICE_CENTS).contains(&self.pricing.bulk_discount_cents) {
            return Err(ConfigError::Invalid(format!(
                "pricing.bulk_discount_cents must be between 0 and {MAX_PRICE_CENTS}"
            )));
        }

        Ok(())
    }

    /// Applies `STOCKSLIP_*` overrides read through `var`.
    ///
    /// Unparseable values are logged and ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("STOCKSLIP_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("STOCKSLIP_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid STOCKSLIP_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = var("STOCKSLIP_DB_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid STOCKSLIP_DB_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(policy) = var("STOCKSLIP_RESOLUTION_POLICY") {
            match policy.trim().to_lowercase().as_str() {
                "first_match" | "first" => {
                    self.engine.resolution_policy = ResolutionPolicy::FirstMatch
                }
                "strict" => self.engine.resolution_policy = ResolutionPolicy::Strict,
                _ => warn!(policy = %policy, "Unknown resolution policy in environment"),
            }
        }

        if let Some(ms) = var("STOCKSLIP_REQUEST_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.engine.request_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid STOCKSLIP_REQUEST_TIMEOUT_MS"),
            }
        }

        if let Some(threshold) = var("STOCKSLIP_BULK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(n) => self.pricing.bulk_threshold = n,
                Err(_) => warn!(value = %threshold, "Ignoring invalid STOCKSLIP_BULK_THRESHOLD"),
            }
        }

        if let Some(cents) = var("STOCKSLIP_BULK_DISCOUNT_CENTS") {
            match cents.parse::<i64>() {
                Ok(n) => self.pricing.bulk_discount_cents = n,
                Err(_) => warn!(value = %cents, "Ignoring invalid STOCKSLIP_BULK_DISCOUNT_CENTS"),
            }
        }

        if let Some(filter) = var("STOCKSLIP_LOG") {
            self.log_filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("stockslip.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "stockslip", "stockslip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.engine.resolution_policy, ResolutionPolicy::FirstMatch);
        assert_eq!(config.engine.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.pricing.bulk_threshold, 10);
        assert_eq!(config.pricing.bulk_discount_cents, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [engine]
            resolution_policy = "strict"

            [pricing]
            bulk_threshold = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.resolution_policy, ResolutionPolicy::Strict);
        assert_eq!(config.engine.request_timeout_ms, 10_000);
        assert_eq!(config.pricing.bulk_threshold, 20);
        assert_eq!(config.pricing.bulk_discount_cents, 1_000);
        assert_eq!(config.pricing.bulk_cover_types.len(), 3);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_unknown_policy_is_a_parse_error() {
        let err = EngineConfig::from_toml("[engine]\nresolution_policy = \"closest\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKSLIP_DB_PATH", "/tmp/slips.db"),
            ("STOCKSLIP_RESOLUTION_POLICY", "STRICT"),
            ("STOCKSLIP_REQUEST_TIMEOUT_MS", "2500"),
            ("STOCKSLIP_BULK_THRESHOLD", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/slips.db"));
        assert_eq!(config.engine.resolution_policy, ResolutionPolicy::Strict);
        assert_eq!(config.engine.request_timeout_ms, 2_500);
        assert_eq!(config.pricing.bulk_threshold, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.engine.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.engine.request_timeout_ms = 1_000;
        config.database.min_connections = 10;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.pricing.bulk_discount_cents = -5;
        assert!(config.validate().is_err());

        config.pricing.bulk_discount_cents = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = EngineConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[pricing]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("first_match"));

        let parsed = EngineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }
}
