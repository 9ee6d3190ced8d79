//! Earnings growth metrics.
//!
//! Pure functions over an `EarningsSeries`. Degenerate inputs (short series,
//! zero or near-zero previous value) resolve to a defined fallback instead of
//! an error: growth falls back to 0, predicates fall back to false.

use crate::domain::{EarningsSeries, FundamentalSnapshot};
use serde::{Deserialize, Serialize};

/// Latest growth rate above which a rising rate counts as acceleration.
pub const ACCELERATION_MIN_GROWTH_PCT: f64 = 25.0;

/// Latest growth rate below which a falling rate counts as deceleration.
pub const DECELERATION_MAX_GROWTH_PCT: f64 = 15.0;

/// Previous values with a smaller magnitude are treated as zero.
pub const MIN_BASE_MAGNITUDE: f64 = 1e-6;

/// Rounding slack when comparing a growth rate against a threshold.
/// 1.2 → 1.5 computes to 25.000000000000004, which must not clear "> 25".
pub const GROWTH_TOLERANCE_PCT: f64 = 1e-9;

/// Percentage change from `previous` to `latest`, relative to `|previous|`.
///
/// Returns 0 when `|previous|` is below `MIN_BASE_MAGNITUDE` or the result is
/// not finite.
pub fn growth_pct(previous: f64, latest: f64) -> f64 {
    if previous.abs() < MIN_BASE_MAGNITUDE {
        return 0.0;
    }
    let g = (latest - previous) / previous.abs() * 100.0;
    if g.is_finite() {
        g
    } else {
        0.0
    }
}

/// Growth rates between consecutive values.
fn growth_rates(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| growth_pct(w[0], w[1])).collect()
}

/// Growth between the two most recent entries. Fewer than 2 entries → 0.
pub fn quarterly_growth(series: &EarningsSeries) -> f64 {
    match series.tail(2) {
        Some(v) => growth_pct(v[0], v[1]),
        None => 0.0,
    }
}

/// Mean of the two year-over-year growths across the last 3 entries.
/// Fewer than 3 entries → 0.
pub fn annual_growth(series: &EarningsSeries) -> f64 {
    match series.tail(3) {
        Some(v) => {
            let rates = growth_rates(&v);
            rates.iter().sum::<f64>() / rates.len() as f64
        }
        None => 0.0,
    }
}

/// Latest growth rate is above the previous one and above 25%.
/// Fewer than 3 entries → false.
pub fn accelerating(series: &EarningsSeries) -> bool {
    let Some(v) = series.tail(3) else {
        return false;
    };
    let rates = growth_rates(&v);
    let (prior, latest) = (rates[0], rates[1]);
    latest > prior && latest > ACCELERATION_MIN_GROWTH_PCT + GROWTH_TOLERANCE_PCT
}

/// Last three growth rates strictly decrease and the latest is below 15%.
///
/// Three growth rates need four entries; shorter series are never
/// decelerating.
pub fn decelerating(series: &EarningsSeries) -> bool {
    let Some(v) = series.tail(4) else {
        return false;
    };
    let rates = growth_rates(&v);
    rates.windows(2).all(|w| w[1] < w[0])
        && rates[2] < DECELERATION_MAX_GROWTH_PCT - GROWTH_TOLERANCE_PCT
}

/// Growth metrics derived from one snapshot. Lives for one screening pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub quarterly_eps_growth_pct: f64,
    /// Mean of the last two year-over-year growths.
    pub annual_eps_growth_pct: f64,
    pub accelerating: bool,
    pub decelerating: bool,
}

impl DerivedMetrics {
    pub fn derive(snapshot: &FundamentalSnapshot) -> Self {
        Self {
            quarterly_eps_growth_pct: quarterly_growth(&snapshot.quarterly_earnings),
            annual_eps_growth_pct: annual_growth(&snapshot.annual_earnings),
            accelerating: accelerating(&snapshot.quarterly_earnings),
            decelerating: decelerating(&snapshot.quarterly_earnings),
        }
    }
}
