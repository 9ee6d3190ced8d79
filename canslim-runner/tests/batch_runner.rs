//! Integration tests for the batch runner with in-memory providers.
//!
//! No test touches the network: fundamentals and price history come from
//! mock providers, and the price cache lives in a temp directory.

use canslim_core::data::{DataError, DataProvider, DataSource, FetchResult, FundamentalsProvider};
use canslim_core::domain::{Bar, EarningsSeries, FundamentalSnapshot};
use canslim_core::screen::Criterion;
use canslim_runner::{
    BatchError, BatchReport, BatchRunner, ScreenProgress, ScreenerConfig, SkipKind, TickerOutcome,
};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Mock providers ───────────────────────────────────────────────────

#[derive(Default)]
struct MockFundamentals {
    snapshots: HashMap<String, FundamentalSnapshot>,
}

impl FundamentalsProvider for MockFundamentals {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        self.snapshots
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

#[derive(Default)]
struct MockPrices {
    series: HashMap<String, Vec<Bar>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockPrices {
    fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
    }
}

impl DataProvider for MockPrices {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_insert(0) += 1;
        let bars = self
            .series
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::NetworkUnreachable(format!("no route for {symbol}")))?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

/// `n` daily bars ending at `as_of()`.
fn bars(closes: &[f64], volume: u64) -> Vec<Bar> {
    let first = as_of() - Duration::days(closes.len() as i64 - 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: first + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        })
        .collect()
}

fn leader() -> Vec<Bar> {
    let closes: Vec<f64> = (0..260).map(|i| 40.0 * 1.01_f64.powi(i)).collect();
    bars(&closes, 2_000_000)
}

fn index() -> Vec<Bar> {
    let closes: Vec<f64> = (0..260).map(|i| 4000.0 + i as f64 * 2.0).collect();
    bars(&closes, 1)
}

fn growth_snapshot(shares: u64) -> FundamentalSnapshot {
    FundamentalSnapshot {
        quarterly_earnings: EarningsSeries::from_values(&[1.0, 1.3, 1.82]),
        annual_earnings: EarningsSeries::from_values(&[2.0, 2.56, 3.2768]),
        shares_outstanding: shares,
        institutional_ownership_pct: 35.0,
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: ScreenerConfig,
    fundamentals: Arc<MockFundamentals>,
    prices: Arc<MockPrices>,
}

impl Fixture {
    /// Universe: LEAD passes, BIG fails on shares, GONE has no fundamentals,
    /// NOPX has no price history, BAD has a negative close.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScreenerConfig::default();
        config.data.cache_dir = dir.path().to_path_buf();
        config.batch.throttle_ms = 0;

        let mut fundamentals = MockFundamentals::default();
        for (ticker, shares) in [
            ("LEAD", 50_000_000),
            ("BIG", 250_000_000),
            ("NOPX", 50_000_000),
            ("BAD", 50_000_000),
        ] {
            fundamentals
                .snapshots
                .insert(ticker.to_string(), growth_snapshot(shares));
        }

        let mut corrupt = leader();
        corrupt[10].close = -1.0;

        let mut prices = MockPrices::default();
        prices.series.insert("^GSPC".into(), index());
        prices.series.insert("LEAD".into(), leader());
        prices.series.insert("BIG".into(), leader());
        prices.series.insert("BAD".into(), corrupt);

        Self {
            _dir: dir,
            config,
            fundamentals: Arc::new(fundamentals),
            prices: Arc::new(prices),
        }
    }

    fn runner(&self) -> BatchRunner {
        BatchRunner::new(
            &self.config,
            self.fundamentals.clone(),
            Some(self.prices.clone() as Arc<dyn DataProvider>),
            as_of(),
        )
    }
}

fn universe() -> Vec<String> {
    ["LEAD", "BIG", "GONE", "NOPX", "BAD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn mixed_universe_is_aggregated() {
    let fx = Fixture::new();
    let report = fx.runner().run(&universe(), None).unwrap();

    assert_eq!(report.evaluated, 5);
    assert_eq!(report.benchmark, "^GSPC");

    assert_eq!(report.passed(), 1);
    assert_eq!(report.results[0].ticker, "LEAD");
    assert_eq!(report.results[0].shares_outstanding, 50_000_000);

    assert_eq!(report.rejected(), 1);
    assert_eq!(report.rejections.get(&Criterion::SharesOutstanding), Some(&1));

    let skipped: Vec<(&str, SkipKind)> = report
        .skipped
        .iter()
        .map(|s| (s.ticker.as_str(), s.kind))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("GONE", SkipKind::MissingFundamentals),
            ("NOPX", SkipKind::MissingPrices),
            ("BAD", SkipKind::InvalidInput),
        ]
    );
}

#[test]
fn benchmark_is_fetched_once_per_batch() {
    let fx = Fixture::new();
    fx.runner().run(&universe(), None).unwrap();
    assert_eq!(fx.prices.calls_for("^GSPC"), 1);
    // A ticker without fundamentals never costs a price request.
    assert_eq!(fx.prices.calls_for("GONE"), 0);
}

#[test]
fn second_run_is_served_from_cache() {
    let fx = Fixture::new();
    let first = fx.runner().run(&universe(), None).unwrap();
    let second = fx.runner().run(&universe(), None).unwrap();

    assert_eq!(first.results, second.results);
    assert_eq!(fx.prices.calls_for("^GSPC"), 1);
    assert_eq!(fx.prices.calls_for("LEAD"), 1);
}

#[test]
fn missing_benchmark_fails_the_batch() {
    let mut fx = Fixture::new();
    fx.config.screen.benchmark = "^NOPE".into();
    let err = fx.runner().run(&universe(), None).unwrap_err();
    assert!(matches!(err, BatchError::Benchmark { ref symbol, .. } if symbol == "^NOPE"));
}

#[test]
fn offline_without_cache_fails_the_batch() {
    let mut fx = Fixture::new();
    fx.config.data.offline = true;
    let err = fx.runner().run(&universe(), None).unwrap_err();
    assert!(matches!(err, BatchError::Benchmark { .. }));
    assert_eq!(fx.prices.calls_for("^GSPC"), 0);
}

#[test]
fn empty_universe_is_an_error() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.runner().run(&[], None),
        Err(BatchError::NoTickers)
    ));
}

#[test]
fn stricter_criteria_from_config_apply() {
    let mut fx = Fixture::new();
    fx.config.criteria.min_institutional_ownership_pct = 50.0;
    let report = fx.runner().run(&universe(), None).unwrap();
    assert_eq!(report.passed(), 0);
    assert_eq!(
        report.rejections.get(&Criterion::InstitutionalOwnership),
        Some(&1)
    );
}

#[test]
fn parallel_run_matches_sequential_order() {
    let fx = Fixture::new();
    let sequential = fx.runner().run(&universe(), None).unwrap();

    let mut parallel_fx = Fixture::new();
    parallel_fx.config.batch.parallelism = 4;
    let parallel = parallel_fx.runner().run(&universe(), None).unwrap();

    assert_eq!(sequential.results, parallel.results);
    assert_eq!(sequential.rejections, parallel.rejections);
    assert_eq!(sequential.skipped, parallel.skipped);
}

#[derive(Default)]
struct CountingProgress {
    started: AtomicUsize,
    completed: AtomicUsize,
    batches: AtomicUsize,
    passed: AtomicUsize,
}

impl ScreenProgress for CountingProgress {
    fn on_start(&self, _ticker: &str, index: usize, total: usize) {
        assert!(index < total);
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, _ticker: &str, _index: usize, _total: usize, outcome: &TickerOutcome) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if matches!(outcome, TickerOutcome::Passed(_)) {
            self.passed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        assert_eq!(report.evaluated, self.completed.load(Ordering::SeqCst));
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_sees_every_ticker() {
    let fx = Fixture::new();
    let progress = CountingProgress::default();
    fx.runner().run(&universe(), Some(&progress)).unwrap();

    assert_eq!(progress.started.load(Ordering::SeqCst), 5);
    assert_eq!(progress.completed.load(Ordering::SeqCst), 5);
    assert_eq!(progress.passed.load(Ordering::SeqCst), 1);
    assert_eq!(progress.batches.load(Ordering::SeqCst), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every ticker lands in exactly one bucket.
    #[test]
    fn outcome_buckets_partition_the_universe(
        picks in prop::collection::vec(0usize..5, 1..12),
    ) {
        let fx = Fixture::new();
        let all = universe();
        let tickers: Vec<String> = picks.iter().map(|&i| all[i].clone()).collect();

        let report = fx.runner().run(&tickers, None).unwrap();
        prop_assert_eq!(report.evaluated, tickers.len());
        prop_assert_eq!(
            report.passed() + report.rejected() + report.skipped.len(),
            tickers.len()
        );
    }
}
