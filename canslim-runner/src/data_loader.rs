//! Price history loading for the runner.
//!
//! Given a symbol, returns its daily bars over the requested window.
//! Implements the fallback policy:
//! 1. If a fresh cache entry covers the window → use it
//! 2. If online and a provider is configured and available → download, cache, use
//! 3. If the download fails, the provider is blocked or we are offline → use a
//!    stale cache entry, if any
//! 4. Otherwise → fail with a clear error

use crate::throttle::Throttle;
use canslim_core::data::{DataError, DataProvider, DataSource, Freshness, ParquetCache};
use canslim_core::domain::Bar;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and network access is disabled")]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and no data provider configured")]
    NoProvider { symbol: String },

    #[error("no cached data for '{symbol}' and provider '{provider}' is not accepting requests")]
    ProviderUnavailable { symbol: String, provider: String },

    #[error("download failed for '{symbol}': {source}")]
    DownloadFailed {
        symbol: String,
        #[source]
        source: DataError,
    },
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First date of the window (inclusive).
    pub start: NaiveDate,
    /// Last date of the window (inclusive).
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Cache entries older than this are refetched when online.
    pub max_age: chrono::Duration,
    /// Refetch even when the cache is fresh.
    pub force: bool,
}

impl LoadOptions {
    /// Window of `lookback_days` calendar days ending at `end`.
    pub fn lookback(end: NaiveDate, lookback_days: u32) -> Self {
        Self {
            start: end - chrono::Duration::days(i64::from(lookback_days)),
            end,
            offline: false,
            max_age: chrono::Duration::hours(12),
            force: false,
        }
    }
}

/// Bars for one symbol plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

/// Load bars for one symbol from the cache, falling back to the provider.
pub fn load_prices(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    throttle: &Throttle,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let freshness = cache.freshness(symbol, opts.start, opts.max_age);

    if !opts.force && freshness == Freshness::Fresh {
        match cache.load(symbol) {
            Ok(bars) => return Ok(from_cache(bars, opts)),
            Err(e) => tracing::warn!(symbol, error = %e, "cache entry unreadable, refetching"),
        }
    }

    if opts.offline {
        return stale_fallback(symbol, cache, opts).ok_or_else(|| LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }

    let Some(provider) = provider else {
        return stale_fallback(symbol, cache, opts).ok_or_else(|| LoadError::NoProvider {
            symbol: symbol.to_string(),
        });
    };

    if !provider.is_available() {
        return stale_fallback(symbol, cache, opts).ok_or_else(|| {
            LoadError::ProviderUnavailable {
                symbol: symbol.to_string(),
                provider: provider.name().to_string(),
            }
        });
    }

    throttle.wait();
    match provider.fetch(symbol, opts.start, opts.end) {
        Ok(fetched) => {
            if !fetched.bars.is_empty() {
                if let Err(e) = cache.write(symbol, &fetched.bars, opts.start, provider.name()) {
                    tracing::warn!(symbol, error = %e, "failed to cache price history");
                }
            }
            Ok(LoadedSeries {
                bars: within(fetched.bars, opts),
                source: fetched.source,
            })
        }
        Err(source) => match stale_fallback(symbol, cache, opts) {
            Some(series) => {
                tracing::warn!(symbol, error = %source, "download failed, using stale cache");
                Ok(series)
            }
            None => Err(LoadError::DownloadFailed {
                symbol: symbol.to_string(),
                source,
            }),
        },
    }
}

fn stale_fallback(symbol: &str, cache: &ParquetCache, opts: &LoadOptions) -> Option<LoadedSeries> {
    let bars = cache.load(symbol).ok()?;
    tracing::debug!(symbol, "serving price history from stale cache");
    Some(from_cache(bars, opts))
}

fn from_cache(bars: Vec<Bar>, opts: &LoadOptions) -> LoadedSeries {
    LoadedSeries {
        bars: within(bars, opts),
        source: DataSource::Cache,
    }
}

fn within(mut bars: Vec<Bar>, opts: &LoadOptions) -> Vec<Bar> {
    bars.retain(|b| b.date >= opts.start && b.date <= opts.end);
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use canslim_core::data::FetchResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        available: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
                available: true,
            }
        }

        fn blocked() -> Self {
            Self {
                available: false,
                ..Self::new(false)
            }
        }
    }

    impl DataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::NetworkUnreachable("offline".into()));
            }
            let bars = (0..5)
                .map(|i| Bar {
                    date: start + chrono::Duration::days(i),
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.0 + i as f64,
                    volume: 100,
                })
                .collect();
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars,
                source: DataSource::Fixture,
            })
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn opts() -> LoadOptions {
        LoadOptions {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            offline: false,
            max_age: chrono::Duration::hours(12),
            force: false,
        }
    }

    #[test]
    fn downloads_then_serves_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::new(false);
        let throttle = Throttle::none();

        let first = load_prices("ACME", &cache, Some(&provider), &throttle, &opts()).unwrap();
        assert_eq!(first.source, DataSource::Fixture);
        assert_eq!(first.bars.len(), 5);

        let second = load_prices("ACME", &cache, Some(&provider), &throttle, &opts()).unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.bars, first.bars);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::new(false);
        let throttle = Throttle::none();
        let forced = LoadOptions {
            force: true,
            ..opts()
        };

        load_prices("ACME", &cache, Some(&provider), &throttle, &forced).unwrap();
        load_prices("ACME", &cache, Some(&provider), &throttle, &forced).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn offline_without_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let offline = LoadOptions {
            offline: true,
            ..opts()
        };
        let err = load_prices("ACME", &cache, None, &Throttle::none(), &offline).unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
    }

    #[test]
    fn offline_uses_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::new(false);
        load_prices("ACME", &cache, Some(&provider), &Throttle::none(), &opts()).unwrap();

        let offline_stale = LoadOptions {
            offline: true,
            max_age: chrono::Duration::seconds(-1),
            ..opts()
        };
        let loaded =
            load_prices("ACME", &cache, None, &Throttle::none(), &offline_stale).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.bars.len(), 5);
    }

    #[test]
    fn failed_download_without_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::new(true);
        let err =
            load_prices("ACME", &cache, Some(&provider), &Throttle::none(), &opts()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DownloadFailed {
                source: DataError::NetworkUnreachable(_),
                ..
            }
        ));
    }

    #[test]
    fn blocked_provider_is_not_called() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::blocked();
        let err =
            load_prices("ACME", &cache, Some(&provider), &Throttle::none(), &opts()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ProviderUnavailable { ref provider, .. } if provider == "counting"
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blocked_provider_falls_back_to_stale_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        load_prices(
            "ACME",
            &cache,
            Some(&CountingProvider::new(false)),
            &Throttle::none(),
            &opts(),
        )
        .unwrap();

        let stale = LoadOptions {
            max_age: chrono::Duration::seconds(-1),
            ..opts()
        };
        let provider = CountingProvider::blocked();
        let loaded =
            load_prices("ACME", &cache, Some(&provider), &Throttle::none(), &stale).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.bars.len(), 5);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn window_is_applied_to_cached_bars() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = CountingProvider::new(false);
        load_prices("ACME", &cache, Some(&provider), &Throttle::none(), &opts()).unwrap();

        let narrow = LoadOptions {
            end: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ..opts()
        };
        let loaded = load_prices("ACME", &cache, None, &Throttle::none(), &narrow).unwrap();
        assert_eq!(loaded.bars.len(), 3);
    }
}
