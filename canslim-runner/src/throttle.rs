//! Request pacing shared by every worker in a batch.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive requests.
///
/// `wait` reserves the next slot under the lock and sleeps outside it, so
/// concurrent callers queue up one interval apart.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A throttle that never waits.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the caller may issue its next request.
    pub fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let now = Instant::now();
        let slot = {
            let mut next = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        let delay = slot.saturating_duration_since(now);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
