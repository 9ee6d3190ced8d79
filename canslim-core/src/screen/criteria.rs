//! The eight CANSLIM criteria and their thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the screening cascade, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// C: current quarterly EPS growth, overridden by deceleration.
    QuarterlyEarnings,
    /// A: annual EPS growth.
    AnnualEarnings,
    /// N: price at or near a new high.
    NearHigh,
    /// S: supply of shares (small/mid float).
    SharesOutstanding,
    /// Pullbacks on below-average volume.
    VolumeDryUp,
    /// L: leader versus the benchmark.
    RelativeStrength,
    /// I: institutional sponsorship.
    InstitutionalOwnership,
    /// M: market direction.
    MarketTrend,
}

impl Criterion {
    /// All criteria in cascade order.
    pub const ALL: [Criterion; 8] = [
        Criterion::QuarterlyEarnings,
        Criterion::AnnualEarnings,
        Criterion::NearHigh,
        Criterion::SharesOutstanding,
        Criterion::VolumeDryUp,
        Criterion::RelativeStrength,
        Criterion::InstitutionalOwnership,
        Criterion::MarketTrend,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::QuarterlyEarnings => "quarterly_earnings",
            Criterion::AnnualEarnings => "annual_earnings",
            Criterion::NearHigh => "near_high",
            Criterion::SharesOutstanding => "shares_outstanding",
            Criterion::VolumeDryUp => "volume_dry_up",
            Criterion::RelativeStrength => "relative_strength",
            Criterion::InstitutionalOwnership => "institutional_ownership",
            Criterion::MarketTrend => "market_trend",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Thresholds for the cascade. `Default` is the classic CANSLIM setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    pub min_quarterly_eps_growth_pct: f64,
    pub min_annual_eps_growth_pct: f64,
    /// Latest close must be at least this fraction of the window high.
    pub near_high_ratio: f64,
    pub max_shares_outstanding: u64,
    pub min_institutional_ownership_pct: f64,
    /// Moving-average period for the market trend filter.
    pub market_sma_period: usize,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            min_quarterly_eps_growth_pct: 25.0,
            min_annual_eps_growth_pct: 25.0,
            near_high_ratio: 0.95,
            max_shares_outstanding: 200_000_000,
            min_institutional_ownership_pct: 30.0,
            market_sma_period: 200,
        }
    }
}
