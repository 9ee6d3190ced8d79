//! Technical price/volume patterns.
//!
//! Every detector is a free function over an immutable, chronological bar
//! slice and returns a boolean signal. Empty or too-short input fails closed
//! (false), with the one documented exception of `volume_dry_up` when a
//! non-empty series has no pullbacks.

pub mod base_on_base;
pub mod near_high;
pub mod relative_strength;
pub mod trend;
pub mod volume_dry_up;

pub use base_on_base::{base_on_base, consolidation_windows, BASE_WINDOW, MAX_BASE_RANGE};
pub use near_high::near_high;
pub use relative_strength::{relative_strength, rs_line};
pub use trend::market_uptrend;
pub use volume_dry_up::{pullback_indices, volume_dry_up, PULLBACK_THRESHOLD};

/// Bars with the given closes and volumes, one calendar day apart.
#[cfg(test)]
pub(crate) fn bars_with_volume(closes: &[f64], volumes: &[u64]) -> Vec<crate::domain::Bar> {
    assert_eq!(closes.len(), volumes.len());
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| crate::domain::Bar {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}
