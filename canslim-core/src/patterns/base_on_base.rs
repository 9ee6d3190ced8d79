//! Base-on-base detection.
//!
//! The series is cut front-to-back into non-overlapping windows of
//! `BASE_WINDOW` bars; a trailing partial window is ignored. A window is a
//! consolidation (a "base") when its close range is tight relative to its
//! lowest close. Base-on-base means the two most recent windows are both bases.

use crate::domain::Bar;

/// Bars per window.
pub const BASE_WINDOW: usize = 20;

/// A window is tight when `max − min < MAX_BASE_RANGE × min`.
pub const MAX_BASE_RANGE: f64 = 0.15;

fn is_consolidation(window: &[Bar]) -> bool {
    let (min, max) = window
        .iter()
        .map(|b| b.close)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c), hi.max(c))
        });
    max - min < MAX_BASE_RANGE * min
}

/// Consolidation flag for each complete window, oldest first.
pub fn consolidation_windows(bars: &[Bar]) -> Vec<bool> {
    bars.chunks_exact(BASE_WINDOW).map(is_consolidation).collect()
}

/// Two consecutive tight bases at the end of the series.
/// Fewer than two complete windows → false.
pub fn base_on_base(bars: &[Bar]) -> bool {
    match consolidation_windows(bars).as_slice() {
        [.., prev, last] => *prev && *last,
        _ => false,
    }
}
