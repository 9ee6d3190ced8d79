//! Ticker universes: named groups of symbols to screen.
//!
//! A universe is either a TOML file of groups:
//!
//! ```toml
//! [groups]
//! growth = ["NVDA", "CELH"]
//! watchlist = ["SMCI"]
//! ```
//!
//! or a plain newline-separated ticker list, such as the published list of
//! every US-listed symbol.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Newline-separated list of all NASDAQ, NYSE and AMEX symbols.
pub const DEFAULT_TICKER_LIST_URL: &str =
    "https://raw.githubusercontent.com/rreichel3/US-Stock-Symbols/main/all/all_tickers.txt";

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("download ticker list from {url}: {message}")]
    Download { url: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    /// Build a single-group universe from a newline-separated list.
    ///
    /// Lines are trimmed; blanks and duplicates are dropped. Tickers are
    /// sorted so runs are reproducible.
    pub fn from_ticker_list(group: &str, text: &str) -> Self {
        let tickers: BTreeSet<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let mut groups = BTreeMap::new();
        groups.insert(
            group.to_string(),
            tickers.into_iter().map(String::from).collect(),
        );
        Self { groups }
    }

    /// Download a ticker list and wrap it as a single-group universe.
    pub fn fetch_remote(url: &str) -> Result<Self, UniverseError> {
        let download_err = |message: String| UniverseError::Download {
            url: url.to_string(),
            message,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| download_err(e.to_string()))?;
        let resp = client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(download_err(format!("HTTP {}", resp.status())));
        }
        let text = resp.text().map_err(|e| download_err(e.to_string()))?;

        let universe = Self::from_ticker_list("all_us", &text);
        tracing::info!(url, tickers = universe.ticker_count(), "downloaded ticker list");
        Ok(universe)
    }

    /// All tickers across all groups, deduplicated, in first-seen order.
    pub fn all_tickers(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.groups
            .values()
            .flat_map(|tickers| tickers.iter().map(String::as_str))
            .filter(|t| seen.insert(*t))
            .collect()
    }

    pub fn group_tickers(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Number of distinct tickers.
    pub fn ticker_count(&self) -> usize {
        self.all_tickers().len()
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
