//! Data provider traits and structured error types.
//!
//! Two seams feed the screen: price history (`DataProvider`) and company
//! fundamentals (`FundamentalsProvider`). Both are object-safe and
//! `Send + Sync` so the batch runner can share them across worker threads and
//! tests can substitute in-memory fakes.

use crate::domain::{Bar, FundamentalSnapshot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in both CLI logs and the JSON batch report.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no fundamentals available for '{symbol}': {reason}")]
    MissingFundamentals { symbol: String, reason: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}'")]
    NoCachedData { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful price fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Cache,
    Fixture,
}

/// Trait for price history providers.
///
/// Implementations handle the specifics of fetching data from a particular source.
/// The cache layer sits above this trait; providers don't know about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range, oldest first.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Trait for fundamentals providers.
///
/// An `Err` means the ticker cannot be screened at all and is skipped.
pub trait FundamentalsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError>;
}

/// Drop void and unsorted bars so downstream code sees a clean, chronological series.
pub fn clean_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.retain(|b| !b.is_void());
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}
