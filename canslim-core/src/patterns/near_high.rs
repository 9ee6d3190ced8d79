//! New-high proximity: the latest close is within reach of the window's high.

use crate::domain::Bar;

/// Latest close ≥ `ratio` × the maximum close over the whole series.
/// Empty series → false.
pub fn near_high(bars: &[Bar], ratio: f64) -> bool {
    let Some(last) = bars.last() else {
        return false;
    };
    let max_close = bars.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    last.close >= max_close * ratio
}
