//! Screener configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the standard CANSLIM screen against the S&P 500.

use canslim_core::screen::CriteriaConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub screen: ScreenSection,
    pub criteria: CriteriaConfig,
    pub batch: BatchSection,
    pub data: DataSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSection {
    /// Symbol used for relative strength and the market trend check.
    pub benchmark: String,
    /// Calendar days of price history loaded per ticker.
    pub lookback_days: u32,
}

impl Default for ScreenSection {
    fn default() -> Self {
        Self {
            benchmark: "^GSPC".into(),
            lookback_days: 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Minimum delay between consecutive provider requests.
    pub throttle_ms: u64,
    /// Worker threads; 1 evaluates tickers sequentially.
    pub parallelism: usize,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            throttle_ms: 1000,
            parallelism: 1,
        }
    }
}

impl BatchSection {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub cache_dir: PathBuf,
    /// Cached price history older than this is refetched.
    pub cache_max_age_hours: u32,
    /// Never download price history; serve it from the cache only.
    pub offline: bool,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            cache_max_age_hours: 12,
            offline: false,
        }
    }
}

impl DataSection {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.cache_max_age_hours))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub csv_path: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("canslim_results.csv"),
        }
    }
}

impl ScreenerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen.benchmark.trim().is_empty() {
            return Err(ConfigError::Invalid("screen.benchmark must not be empty".into()));
        }
        if self.screen.lookback_days == 0 {
            return Err(ConfigError::Invalid("screen.lookback_days must be positive".into()));
        }
        if self.batch.parallelism == 0 {
            return Err(ConfigError::Invalid("batch.parallelism must be at least 1".into()));
        }
        let c = &self.criteria;
        if !(0.0..=1.0).contains(&c.near_high_ratio) {
            return Err(ConfigError::Invalid(format!(
                "criteria.near_high_ratio must be within [0, 1], got {}",
                c.near_high_ratio
            )));
        }
        if c.market_sma_period == 0 {
            return Err(ConfigError::Invalid(
                "criteria.market_sma_period must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Content hash of the effective configuration, recorded in batch reports.
    pub fn config_hash(&self) -> String {
        // Serializing plain structs of strings and numbers cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
