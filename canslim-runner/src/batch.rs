//! Batch screening over a universe of tickers.
//!
//! `BatchRunner::run` loads the benchmark once, then evaluates every ticker:
//! fundamentals first (a ticker without them is skipped before any price
//! request), then price history, then the criteria cascade. Per-ticker
//! problems are recorded in the report and never abort the batch; only a
//! missing benchmark does.

use crate::config::ScreenerConfig;
use crate::data_loader::{load_prices, LoadError, LoadOptions};
use crate::throttle::Throttle;
use canslim_core::data::{DataProvider, FundamentalsProvider, ParquetCache};
use canslim_core::domain::{Bar, ScreenResult};
use canslim_core::screen::{Criterion, ScreenOutcome, ScreeningEngine};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no tickers to screen")]
    NoTickers,

    #[error("benchmark '{symbol}' unavailable: {source}")]
    Benchmark {
        symbol: String,
        #[source]
        source: LoadError,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Why a ticker could not be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    MissingFundamentals,
    MissingPrices,
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub kind: SkipKind,
    pub reason: String,
}

/// What happened to one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    Passed(ScreenResult),
    Rejected(Criterion),
    Skipped(SkippedTicker),
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub benchmark: String,
    pub config_hash: String,
    pub evaluated: usize,
    /// Passing tickers, in universe order.
    pub results: Vec<ScreenResult>,
    /// Number of tickers rejected at each criterion.
    pub rejections: BTreeMap<Criterion, usize>,
    pub skipped: Vec<SkippedTicker>,
    pub elapsed_secs: f64,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.results.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

/// Progress callbacks for a batch run.
pub trait ScreenProgress: Send + Sync {
    /// Called when a ticker starts evaluation.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker finishes.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, outcome: &TickerOutcome);

    /// Called once after every ticker is done.
    fn on_batch_complete(&self, report: &BatchReport);
}

/// Reports progress through `tracing`.
pub struct LogProgress;

impl ScreenProgress for LogProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        tracing::info!("Screening {ticker} ({}/{total})...", index + 1);
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, outcome: &TickerOutcome) {
        match outcome {
            TickerOutcome::Passed(_) => tracing::info!(ticker, "passed all criteria"),
            TickerOutcome::Rejected(criterion) => {
                tracing::debug!(ticker, criterion = %criterion, "rejected")
            }
            TickerOutcome::Skipped(skip) => {
                tracing::warn!(ticker, kind = ?skip.kind, reason = %skip.reason, "skipped")
            }
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        tracing::info!(
            evaluated = report.evaluated,
            passed = report.passed(),
            rejected = report.rejected(),
            skipped = report.skipped.len(),
            elapsed_secs = report.elapsed_secs,
            "batch complete"
        );
    }
}

pub struct BatchRunner {
    engine: ScreeningEngine,
    fundamentals: Arc<dyn FundamentalsProvider>,
    prices: Option<Arc<dyn DataProvider>>,
    cache: ParquetCache,
    throttle: Throttle,
    benchmark: String,
    load_opts: LoadOptions,
    parallelism: usize,
    config_hash: String,
}

impl BatchRunner {
    /// Build a runner from configuration, screening as of `as_of`.
    ///
    /// `prices` may be `None` for cache-only runs.
    pub fn new(
        config: &ScreenerConfig,
        fundamentals: Arc<dyn FundamentalsProvider>,
        prices: Option<Arc<dyn DataProvider>>,
        as_of: NaiveDate,
    ) -> Self {
        let load_opts = LoadOptions {
            offline: config.data.offline,
            max_age: config.data.max_age(),
            ..LoadOptions::lookback(as_of, config.screen.lookback_days)
        };
        Self {
            engine: ScreeningEngine::new(config.criteria.clone()),
            fundamentals,
            prices,
            cache: ParquetCache::new(&config.data.cache_dir),
            throttle: Throttle::new(config.batch.throttle_interval()),
            benchmark: config.screen.benchmark.clone(),
            load_opts,
            parallelism: config.batch.parallelism.max(1),
            config_hash: config.config_hash(),
        }
    }

    /// Replace the request throttle.
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Screen every ticker and aggregate the outcomes.
    pub fn run(
        &self,
        tickers: &[String],
        progress: Option<&dyn ScreenProgress>,
    ) -> Result<BatchReport, BatchError> {
        if tickers.is_empty() {
            return Err(BatchError::NoTickers);
        }
        let started = Instant::now();

        let benchmark = self.load(&self.benchmark).map_err(|source| BatchError::Benchmark {
            symbol: self.benchmark.clone(),
            source,
        })?;
        tracing::info!(
            benchmark = %self.benchmark,
            bars = benchmark.len(),
            tickers = tickers.len(),
            "starting batch"
        );

        let total = tickers.len();
        let evaluate = |(index, ticker): (usize, &String)| {
            if let Some(p) = progress {
                p.on_start(ticker, index, total);
            }
            let outcome = self.evaluate(ticker, &benchmark);
            if let Some(p) = progress {
                p.on_complete(ticker, index, total, &outcome);
            }
            outcome
        };

        let outcomes: Vec<TickerOutcome> = if self.parallelism > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallelism)
                .build()
                .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
            pool.install(|| tickers.par_iter().enumerate().map(evaluate).collect())
        } else {
            tickers.iter().enumerate().map(evaluate).collect()
        };

        let report = self.aggregate(outcomes, started);
        if let Some(p) = progress {
            p.on_batch_complete(&report);
        }
        Ok(report)
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, LoadError> {
        load_prices(
            symbol,
            &self.cache,
            self.prices.as_deref(),
            &self.throttle,
            &self.load_opts,
        )
        .map(|loaded| loaded.bars)
    }

    /// Evaluate a single ticker against the already-loaded benchmark.
    pub fn evaluate(&self, ticker: &str, benchmark: &[Bar]) -> TickerOutcome {
        let skip = |kind: SkipKind, reason: String| {
            TickerOutcome::Skipped(SkippedTicker {
                ticker: ticker.to_string(),
                kind,
                reason,
            })
        };

        self.throttle.wait();
        let snapshot = match self.fundamentals.fetch_fundamentals(ticker) {
            Ok(snapshot) => snapshot,
            Err(e) => return skip(SkipKind::MissingFundamentals, e.to_string()),
        };

        let prices = match self.load(ticker) {
            Ok(bars) => bars,
            Err(e) => return skip(SkipKind::MissingPrices, e.to_string()),
        };

        match self.engine.screen(ticker, &snapshot, &prices, benchmark) {
            Ok(ScreenOutcome::Pass(result)) => TickerOutcome::Passed(result),
            Ok(ScreenOutcome::Reject(criterion)) => TickerOutcome::Rejected(criterion),
            Err(e) => skip(SkipKind::InvalidInput, e.to_string()),
        }
    }

    fn aggregate(&self, outcomes: Vec<TickerOutcome>, started: Instant) -> BatchReport {
        let mut report = BatchReport {
            generated_at: Utc::now(),
            benchmark: self.benchmark.clone(),
            config_hash: self.config_hash.clone(),
            evaluated: outcomes.len(),
            results: Vec::new(),
            rejections: BTreeMap::new(),
            skipped: Vec::new(),
            elapsed_secs: 0.0,
        };
        for outcome in outcomes {
            match outcome {
                TickerOutcome::Passed(result) => report.results.push(result),
                TickerOutcome::Rejected(criterion) => {
                    *report.rejections.entry(criterion).or_insert(0) += 1
                }
                TickerOutcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }
        report.elapsed_secs = started.elapsed().as_secs_f64();
        report
    }
}
