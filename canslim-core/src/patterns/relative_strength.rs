//! Relative strength against a benchmark index.
//!
//! The RS line is `stock.close / benchmark.close × 100` per shared session.
//! A stock shows relative strength when the latest RS value sits above the
//! mean RS over the loaded window.

use crate::data::align::common_closes;
use crate::domain::Bar;

/// RS line over the sessions both series share. Sessions where the ratio is
/// not finite (zero or NaN benchmark close) are dropped.
pub fn rs_line(stock: &[Bar], benchmark: &[Bar]) -> Vec<f64> {
    common_closes(stock, benchmark)
        .into_iter()
        .map(|(_, s, b)| s / b * 100.0)
        .filter(|r| r.is_finite())
        .collect()
}

/// Latest RS value exceeds the window mean. Empty input on either side, or
/// no shared sessions, fails closed.
pub fn relative_strength(stock: &[Bar], benchmark: &[Bar]) -> bool {
    if stock.is_empty() || benchmark.is_empty() {
        return false;
    }
    let line = rs_line(stock, benchmark);
    let Some(&latest) = line.last() else {
        return false;
    };
    let mean = line.iter().sum::<f64>() / line.len() as f64;
    latest > mean
}
