//! Fundamental data: earnings series and the per-ticker snapshot.

use serde::{Deserialize, Serialize};

/// One reported earnings figure (a quarter or a fiscal year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsPoint {
    /// Provider label for the period, e.g. "3Q2024" or "2023".
    pub period: String,
    pub value: f64,
}

/// Chronological earnings history, oldest first.
///
/// Values may be negative. Growth helpers in `metrics` guard zero
/// denominators, so the series itself carries no numeric invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EarningsSeries(Vec<EarningsPoint>);

impl EarningsSeries {
    pub fn new(points: Vec<EarningsPoint>) -> Self {
        Self(points)
    }

    /// Build a series from bare values, labelling periods by position.
    pub fn from_values(values: &[f64]) -> Self {
        Self(
            values
                .iter()
                .enumerate()
                .map(|(i, &value)| EarningsPoint {
                    period: format!("p{i}"),
                    value,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[EarningsPoint] {
        &self.0
    }

    /// The last `n` values in chronological order, or `None` if the series is shorter.
    pub fn tail(&self, n: usize) -> Option<Vec<f64>> {
        if self.0.len() < n {
            return None;
        }
        Some(self.0[self.0.len() - n..].iter().map(|p| p.value).collect())
    }
}

/// Everything the screen needs to know about a company's fundamentals.
///
/// Fetched once per ticker per run and never mutated while screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub quarterly_earnings: EarningsSeries,
    pub annual_earnings: EarningsSeries,
    pub shares_outstanding: u64,
    /// Percent of shares held by institutions, in [0, 100].
    pub institutional_ownership_pct: f64,
}
