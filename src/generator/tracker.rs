use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::transaction::Outcome;

/// Counters gathered since the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalSnapshot {
    pub successful: u64,
    pub failed: u64,
    pub dropped: u64,
    /// Mean latency of the successful transactions, zero when there were none.
    pub avg_response_time_s: f64,
}

/// Counters accumulated since the last full reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerTotals {
    pub successful: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl TrackerTotals {
    #[must_use]
    pub const fn executed(&self) -> u64 {
        self.successful.saturating_add(self.failed)
    }
}

#[derive(Debug, Default)]
struct IntervalCounters {
    successful: u64,
    failed: u64,
    dropped: u64,
    response_time_sum: Duration,
}

#[derive(Debug, Default)]
struct TrackerState {
    interval: IntervalCounters,
    totals: TrackerTotals,
}

/// Shared outcome accounting for one load generator.
///
/// Workers log into it concurrently while the scheduler takes one snapshot per
/// reporting tick. A single lock covers both the interval counters and the
/// totals so a snapshot never splits a logged outcome.
#[derive(Debug, Default)]
pub struct ResultTracker {
    state: Mutex<TrackerState>,
}

impl ResultTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log_outcome(&self, outcome: &Outcome) {
        let mut state = self.lock();
        match outcome {
            Outcome::Success(latency) => {
                state.interval.successful = state.interval.successful.saturating_add(1);
                state.interval.response_time_sum =
                    state.interval.response_time_sum.saturating_add(*latency);
                state.totals.successful = state.totals.successful.saturating_add(1);
            }
            Outcome::Failed(_) => {
                state.interval.failed = state.interval.failed.saturating_add(1);
                state.totals.failed = state.totals.failed.saturating_add(1);
            }
            Outcome::Dropped(_) => {
                state.interval.dropped = state.interval.dropped.saturating_add(1);
                state.totals.dropped = state.totals.dropped.saturating_add(1);
            }
        }
    }

    /// Returns the interval counters and zeroes them in one step.
    pub fn reset_and_snapshot(&self) -> IntervalSnapshot {
        let interval = std::mem::take(&mut self.lock().interval);
        let avg_response_time_s = if interval.successful == 0 {
            0.0
        } else {
            interval.response_time_sum.as_secs_f64() / interval.successful as f64
        };
        IntervalSnapshot {
            successful: interval.successful,
            failed: interval.failed,
            dropped: interval.dropped,
            avg_response_time_s,
        }
    }

    /// Clears interval counters and totals.
    pub fn reset(&self) {
        *self.lock() = TrackerState::default();
    }

    #[must_use]
    pub fn totals(&self) -> TrackerTotals {
        self.lock().totals
    }
}
