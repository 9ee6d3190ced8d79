//! Volume dry-up on pullbacks.
//!
//! A pullback bar is a session whose close fell more than 5% from the prior
//! close. Volume has dried up when every pullback traded below the mean
//! volume of the whole series.

use crate::domain::Bar;

/// Day-over-day close change below which a bar is a pullback (−5%).
pub const PULLBACK_THRESHOLD: f64 = -0.05;

/// Indices of pullback bars. The first bar has no prior close and is never a
/// pullback; neither is a bar following a zero close.
pub fn pullback_indices(bars: &[Bar]) -> Vec<usize> {
    bars.windows(2)
        .enumerate()
        .filter_map(|(i, w)| {
            let (prev, cur) = (w[0].close, w[1].close);
            if prev == 0.0 {
                return None;
            }
            ((cur - prev) / prev < PULLBACK_THRESHOLD).then_some(i + 1)
        })
        .collect()
}

/// Every pullback bar traded strictly below the series' mean volume.
///
/// Empty series → false. No pullbacks at all → true.
pub fn volume_dry_up(bars: &[Bar]) -> bool {
    if bars.is_empty() {
        return false;
    }
    let pullbacks = pullback_indices(bars);
    if pullbacks.is_empty() {
        return true;
    }
    let mean_volume = bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64;
    pullbacks
        .into_iter()
        .all(|i| (bars[i].volume as f64) < mean_volume)
}
