//! Wall-clock to tokio-instant mapping.
//! Timers are armed against tokio's clock, so they respect `start_paused`
//! and `tokio::time::advance` in tests.

use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

/// Translates between wall-clock instants and the tokio timer clock.
/// Anchored once; all "now" reads and timer deadlines go through it.
#[derive(Debug, Clone)]
pub struct SchedulerClock {
    epoch_wall: DateTime<Utc>,
    epoch_instant: Instant,
}

impl SchedulerClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor so that wall-clock `epoch` corresponds to `Instant::now()`.
    pub fn anchored_at(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch_wall: epoch,
            epoch_instant: Instant::now(),
        }
    }

    /// Current wall-clock time as seen by the scheduler.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.epoch_instant.elapsed()).unwrap_or_default();
        self.epoch_wall + elapsed
    }

    /// The tokio instant at which wall-clock time `at` occurs.
    /// Instants at or before the epoch clamp to "now", so an overdue
    /// deadline fires immediately instead of being dropped.
    pub fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        match (at - self.epoch_wall).to_std() {
            Ok(offset) => self.epoch_instant + offset,
            Err(_) => Instant::now(),
        }
    }
}

impl Default for SchedulerClock {
    fn default() -> Self {
        Self::new()
    }
}
