//! Two-series date alignment.
//!
//! Relative strength compares a stock with its benchmark session by session.
//! The two histories rarely have identical calendars (IPOs, halts, provider
//! gaps), so they are inner-joined on date: only sessions present in both
//! series take part. No forward-fill.

use crate::domain::Bar;
use chrono::NaiveDate;

/// Closes of the sessions both series share, oldest first.
///
/// Both inputs must be sorted by date ascending (see `check_chronological`).
pub fn common_closes(left: &[Bar], right: &[Bar]) -> Vec<(NaiveDate, f64, f64)> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let (a, b) = (&left[i], &right[j]);
        match a.date.cmp(&b.date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((a.date, a.close, b.close));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Index of the first bar whose date is not strictly after its predecessor.
pub fn first_out_of_order(bars: &[Bar]) -> Option<usize> {
    bars.windows(2)
        .position(|w| w[1].date <= w[0].date)
        .map(|i| i + 1)
}
