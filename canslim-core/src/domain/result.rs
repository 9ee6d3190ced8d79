//! Screening output records.

use serde::{Deserialize, Serialize};

/// A ticker that passed every screening criterion.
///
/// Created once by the screening engine and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub ticker: String,
    pub quarterly_eps_growth_pct: f64,
    pub annual_eps_growth_pct: f64,
    pub shares_outstanding: u64,
    pub institutional_ownership_pct: f64,
    /// Informational only; does not gate the pass.
    pub has_base_on_base: bool,
}
