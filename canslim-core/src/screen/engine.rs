//! Screening engine: the short-circuit criteria cascade.
//!
//! `screen` is a pure function of one ticker's snapshot, its price series and
//! the benchmark series. Criteria run in `Criterion::ALL` order and the first
//! failure ends evaluation. All criteria must hold for a pass, so the order
//! only affects cost, never the outcome.

use super::criteria::{CriteriaConfig, Criterion};
use crate::data::align::{common_closes, first_out_of_order};
use crate::domain::{Bar, FundamentalSnapshot, ScreenResult};
use crate::metrics::DerivedMetrics;
use crate::patterns::{base_on_base, market_uptrend, near_high, relative_strength, volume_dry_up};
use std::fmt;
use thiserror::Error;

/// Which price series an input error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRole {
    Stock,
    Benchmark,
}

impl fmt::Display for SeriesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRole::Stock => f.write_str("stock"),
            SeriesRole::Benchmark => f.write_str("benchmark"),
        }
    }
}

/// Malformed input that would otherwise produce a silent misscreen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenError {
    #[error("{series} series is not strictly chronological at bar {index}")]
    OutOfOrder { series: SeriesRole, index: usize },

    #[error("{series} series has invalid close {value} at bar {index}")]
    InvalidClose {
        series: SeriesRole,
        index: usize,
        value: f64,
    },

    #[error("stock and benchmark series share no trading sessions")]
    NoCommonSessions,
}

/// Result of screening one ticker: a pass record or the first failed criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenOutcome {
    Pass(ScreenResult),
    Reject(Criterion),
}

impl ScreenOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ScreenOutcome::Pass(_))
    }

    /// The pass record, if any.
    pub fn into_result(self) -> Option<ScreenResult> {
        match self {
            ScreenOutcome::Pass(r) => Some(r),
            ScreenOutcome::Reject(_) => None,
        }
    }

    /// The failed criterion, if any.
    pub fn rejection(&self) -> Option<Criterion> {
        match self {
            ScreenOutcome::Pass(_) => None,
            ScreenOutcome::Reject(c) => Some(*c),
        }
    }
}

/// Stateless evaluator holding only the thresholds.
#[derive(Debug, Clone, Default)]
pub struct ScreeningEngine {
    criteria: CriteriaConfig,
}

impl ScreeningEngine {
    pub fn new(criteria: CriteriaConfig) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &CriteriaConfig {
        &self.criteria
    }

    /// Screen one ticker.
    ///
    /// Returns `Err` only for malformed series; every other degenerate case
    /// (empty series, short history, zero earnings) is a rejection.
    pub fn screen(
        &self,
        ticker: &str,
        snapshot: &FundamentalSnapshot,
        prices: &[Bar],
        benchmark: &[Bar],
    ) -> Result<ScreenOutcome, ScreenError> {
        validate_series(prices, SeriesRole::Stock)?;
        validate_series(benchmark, SeriesRole::Benchmark)?;
        if !prices.is_empty()
            && !benchmark.is_empty()
            && common_closes(prices, benchmark).is_empty()
        {
            return Err(ScreenError::NoCommonSessions);
        }

        let c = &self.criteria;
        let metrics = DerivedMetrics::derive(snapshot);

        let checks: [(Criterion, &dyn Fn() -> bool); 8] = [
            (Criterion::QuarterlyEarnings, &|| {
                metrics.quarterly_eps_growth_pct >= c.min_quarterly_eps_growth_pct
                    && !metrics.decelerating
            }),
            (Criterion::AnnualEarnings, &|| {
                metrics.annual_eps_growth_pct >= c.min_annual_eps_growth_pct
            }),
            (Criterion::NearHigh, &|| near_high(prices, c.near_high_ratio)),
            (Criterion::SharesOutstanding, &|| {
                snapshot.shares_outstanding <= c.max_shares_outstanding
            }),
            (Criterion::VolumeDryUp, &|| volume_dry_up(prices)),
            (Criterion::RelativeStrength, &|| {
                relative_strength(prices, benchmark)
            }),
            (Criterion::InstitutionalOwnership, &|| {
                snapshot.institutional_ownership_pct >= c.min_institutional_ownership_pct
            }),
            (Criterion::MarketTrend, &|| {
                market_uptrend(benchmark, c.market_sma_period)
            }),
        ];

        if let Some((failed, _)) = checks.iter().find(|(_, check)| !check()) {
            return Ok(ScreenOutcome::Reject(*failed));
        }

        Ok(ScreenOutcome::Pass(ScreenResult {
            ticker: ticker.to_string(),
            quarterly_eps_growth_pct: metrics.quarterly_eps_growth_pct,
            annual_eps_growth_pct: metrics.annual_eps_growth_pct,
            shares_outstanding: snapshot.shares_outstanding,
            institutional_ownership_pct: snapshot.institutional_ownership_pct,
            has_base_on_base: base_on_base(prices),
        }))
    }
}

/// Screen one ticker with the default thresholds.
pub fn screen(
    ticker: &str,
    snapshot: &FundamentalSnapshot,
    prices: &[Bar],
    benchmark: &[Bar],
) -> Result<ScreenOutcome, ScreenError> {
    ScreeningEngine::default().screen(ticker, snapshot, prices, benchmark)
}

fn validate_series(bars: &[Bar], series: SeriesRole) -> Result<(), ScreenError> {
    if let Some(index) = first_out_of_order(bars) {
        return Err(ScreenError::OutOfOrder { series, index });
    }
    if let Some((index, bar)) = bars
        .iter()
        .enumerate()
        .find(|(_, b)| !b.close.is_finite() || b.close < 0.0)
    {
        return Err(ScreenError::InvalidClose {
            series,
            index,
            value: bar.close,
        });
    }
    Ok(())
}
