//! Parquet price cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar recording the fetch window, a content hash and when the entry was
//! written. A write replaces every partition of the symbol; writes go to a
//! `.tmp` file first and are renamed into place. Partitions that fail to load
//! are renamed to `{file}.quarantined` and ignored.

use super::provider::DataError;
use crate::domain::Bar;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const EXPECTED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    /// Start of the window that was requested when the entry was fetched.
    pub window_start: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: String,
    pub cached_at: DateTime<Utc>,
}

/// Whether a cached entry can serve a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    NotCached,
    /// Cached, but fetched for a shorter lookback than requested.
    Uncovered { window_start: NaiveDate },
    Stale { cached_at: DateTime<Utc> },
    Fresh,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
    pub cached_at: Option<DateTime<Utc>>,
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Replace the cached bars for a symbol.
    ///
    /// `bars` must be sorted by date; `window_start` is the start of the
    /// requested range, which may precede the first bar.
    pub fn write(
        &self,
        symbol: &str,
        bars: &[Bar],
        window_start: NaiveDate,
        source: &str,
    ) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
        remove_partitions(&sym_dir)?;

        let mut by_year: BTreeMap<i32, Vec<&Bar>> = BTreeMap::new();
        for bar in bars {
            by_year.entry(bar.date.year()).or_default().push(bar);
        }

        for (year, year_bars) in &by_year {
            let mut df = bars_to_dataframe(year_bars)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;

            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let payload = serde_json::to_vec(bars)
            .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            window_start,
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: blake3::hash(&payload).to_hex().to_string(),
            source: source.to_string(),
            cached_at: Utc::now(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load all cached bars for a symbol, sorted by date ascending.
    pub fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let sym_dir = self.symbol_dir(symbol);
        if !sym_dir.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let mut all_bars = Vec::new();
        let entries =
            fs::read_dir(&sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        for entry in entries {
            let path = entry
                .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
                .path();

            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path) {
                Ok(bars) => all_bars.extend(bars),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "quarantining corrupt cache file"
                    );
                    let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                }
            }
        }

        if all_bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        all_bars.sort_by_key(|b| b.date);
        Ok(all_bars)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the cached entry covers `start` and is younger than `max_age`.
    pub fn freshness(&self, symbol: &str, start: NaiveDate, max_age: chrono::Duration) -> Freshness {
        let Some(meta) = self.get_meta(symbol) else {
            return Freshness::NotCached;
        };
        if meta.window_start > start {
            return Freshness::Uncovered {
                window_start: meta.window_start,
            };
        }
        if Utc::now() - meta.cached_at > max_age {
            return Freshness::Stale {
                cached_at: meta.cached_at,
            };
        }
        Freshness::Fresh
    }

    /// Symbols with a cache directory, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("symbol="))
                    .map(String::from)
            })
            .collect();
        symbols.sort();
        symbols
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                    cached_at: meta.as_ref().map(|m| m.cached_at),
                }
            })
            .collect()
    }
}

fn remove_partitions(dir: &Path) -> Result<(), DataError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            fs::remove_file(&path)
                .map_err(|e| DataError::CacheError(format!("remove stale partition: {e}")))?;
        }
    }
    Ok(())
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[&Bar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in EXPECTED_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let type_err = |name: &str, e: PolarsError| {
        DataError::ParquetError(format!("{name} column type: {e}"))
    };

    let date_ca = column("date")?.date().map_err(|e| type_err("date", e))?;
    let open_ca = column("open")?.f64().map_err(|e| type_err("open", e))?;
    let high_ca = column("high")?.f64().map_err(|e| type_err("high", e))?;
    let low_ca = column("low")?.f64().map_err(|e| type_err("low", e))?;
    let close_ca = column("close")?.f64().map_err(|e| type_err("close", e))?;
    let vol_ca = column("volume")?.u64().map_err(|e| type_err("volume", e))?;

    (0..df.height())
        .map(|i| {
            let days = date_ca
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(Bar {
                date: epoch() + chrono::Duration::days(i64::from(days)),
                open: open_ca.get(i).unwrap_or(f64::NAN),
                high: high_ca.get(i).unwrap_or(f64::NAN),
                low: low_ca.get(i).unwrap_or(f64::NAN),
                close: close_ca.get(i).unwrap_or(f64::NAN),
                volume: vol_ca.get(i).unwrap_or(0),
            })
        })
        .collect()
}
