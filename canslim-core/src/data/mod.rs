//! Data acquisition: providers, the Yahoo client, Parquet caching and universes.

pub mod align;
pub mod cache;
pub mod circuit_breaker;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, Freshness, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use provider::{
    clean_bars, DataError, DataProvider, DataSource, FetchResult, FundamentalsProvider,
};
pub use universe::{Universe, UniverseError, DEFAULT_TICKER_LIST_URL};
pub use yahoo::YahooProvider;
