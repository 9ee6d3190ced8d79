//! CANSLIM Runner: batch orchestration on top of `canslim-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every field
//! - Price loading with cache/download/stale-cache fallback
//! - A shared request throttle
//! - `BatchRunner`, which screens a universe and returns a `BatchReport`
//! - CSV and JSON export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod throttle;

pub use batch::{
    BatchError, BatchReport, BatchRunner, LogProgress, ScreenProgress, SkipKind, SkippedTicker,
    TickerOutcome,
};
pub use config::{ConfigError, ScreenerConfig};
pub use data_loader::{load_prices, LoadError, LoadOptions, LoadedSeries};
pub use export::{results_to_csv, write_report_json, write_results_csv};
pub use throttle::Throttle;
