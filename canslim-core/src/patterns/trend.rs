//! Market direction filter.
//!
//! The market is in an uptrend when the benchmark's latest close is at or
//! above its simple moving average. Without enough bars for the average the
//! trend is undefined and the filter fails closed.

use crate::domain::Bar;
use crate::indicators::{Indicator, Sma};

/// Latest benchmark close ≥ SMA(`period`) at the last bar.
pub fn market_uptrend(benchmark: &[Bar], period: usize) -> bool {
    let Some(last) = benchmark.last() else {
        return false;
    };
    match Sma::new(period.max(1)).latest(benchmark) {
        Some(sma) => !last.close.is_nan() && last.close >= sma,
        None => false,
    }
}
