use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, SchedulerError};
use crate::profile::ArrivalRateTuple;
use crate::protocol::{IntervalResult, StartParams};

use super::tracker::ResultTracker;
use super::transaction::TransactionPool;
use super::worker::WorkerPool;

/// Upper bound for the default wait between two batches.
pub const MAX_DEFAULT_MEAN_WAIT_MS: i64 = 10;

/// Arrivals below which the wait between batches is stretched over the interval.
const LOW_RATE_THRESHOLD: u64 = 50;

/// Default wait between batches: a tenth of the first interval, at most 10 ms.
///
/// Never shorter than one millisecond.
#[must_use]
pub fn default_mean_wait_ms(first: ArrivalRateTuple) -> i64 {
    let first_interval_ms = (first.time_offset_s() * 1000.0) as i64;
    (first_interval_ms / 10).min(MAX_DEFAULT_MEAN_WAIT_MS).max(1)
}

/// Wait between batches for one interval.
///
/// Intervals with only a handful of arrivals spread them over the remaining
/// time so the last arrival still lands before the deadline.
#[must_use]
pub fn effective_mean_wait_ms(
    default_mean_ms: i64,
    target_ms: i64,
    current_ms: i64,
    remaining: u64,
) -> i64 {
    let mean = if remaining > 1 && remaining < LOW_RATE_THRESHOLD {
        let slots = i64::try_from(remaining).unwrap_or(i64::MAX).saturating_add(1);
        target_ms.saturating_sub(current_ms) / slots
    } else {
        default_mean_ms
    };
    mean.max(1)
}

/// Arrivals to dispatch in the next batch.
///
/// Once less than one mean wait is left before the deadline every remaining
/// arrival goes out at once. Otherwise the remaining arrivals are divided by
/// the number of waits that still fit, rounding down.
#[must_use]
pub fn batch_size(target_ms: i64, current_ms: i64, mean_wait_ms: i64, remaining: u64) -> u64 {
    let time_left = target_ms.saturating_sub(current_ms);
    let mean_wait_ms = mean_wait_ms.max(1);
    if time_left <= mean_wait_ms {
        return remaining;
    }
    let ticks = u64::try_from(time_left / mean_wait_ms).unwrap_or(1).max(1);
    remaining / ticks
}

/// Sleep after a batch in milliseconds.
///
/// Randomized sleeps follow `0.5 m + Exp(mean m / 2)`, clamped to `[0.5 m, 1.5 m]`.
pub fn post_batch_sleep_ms<R>(mean_wait_ms: i64, rng: &mut R, randomize: bool) -> u64
where
    R: Rng + ?Sized,
{
    let mean_wait_ms = mean_wait_ms.max(0);
    if !randomize {
        return u64::try_from(mean_wait_ms).unwrap_or(0);
    }
    let mean = mean_wait_ms as f64;
    let uniform: f64 = rng.r#gen();
    let wait = 0.5 * mean + (-uniform.ln()) * mean / 2.0;
    let wait = wait.clamp(0.5 * mean, 1.5 * mean);
    wait as u64
}

fn elapsed_ms(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or(0))
}

/// Paces one run of a load generator.
///
/// Walks through warmup, pause, the measured profile and the final drain,
/// pushing one [`IntervalResult`] per tick into `results`.
pub struct Scheduler {
    params: StartParams,
    workers: WorkerPool,
    transactions: Arc<TransactionPool>,
    tracker: Arc<ResultTracker>,
    results: mpsc::UnboundedSender<IntervalResult>,
    rng: StdRng,
    default_mean_wait_ms: i64,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        params: StartParams,
        workers: WorkerPool,
        transactions: Arc<TransactionPool>,
        tracker: Arc<ResultTracker>,
        results: mpsc::UnboundedSender<IntervalResult>,
    ) -> Self {
        Self {
            params,
            workers,
            transactions,
            tracker,
            results,
            rng: StdRng::seed_from_u64(params.seed.unsigned_abs()),
            default_mean_wait_ms: MAX_DEFAULT_MEAN_WAIT_MS,
        }
    }

    /// Runs the whole profile and shuts the worker pool down afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error when the profile is empty, the worker pool stops
    /// accepting work, or more arrivals were scheduled than targeted.
    pub async fn run(mut self, profile: &[ArrivalRateTuple]) -> AppResult<()> {
        let first = profile
            .first()
            .copied()
            .ok_or_else(|| AppError::scheduler(SchedulerError::EmptyProfile))?;
        self.default_mean_wait_ms = default_mean_wait_ms(first);
        debug!("Default mean wait between batches: {} ms", self.default_mean_wait_ms);

        self.tracker.reset();
        if self.params.has_warmup() {
            self.warmup().await?;
            self.pause().await;
        }

        self.tracker.reset();
        let time_zero = Instant::now();
        let last_target_ms = self.measure(profile, time_zero).await?;
        self.drain(time_zero, last_target_ms).await;

        let totals = self.tracker.totals();
        info!(
            "Workload finished, {} transactions executed.",
            totals.executed()
        );
        info!("Failed transactions: {}", totals.failed);
        info!("Dropped transactions: {}", totals.dropped);
        self.workers.shutdown().await
    }

    async fn warmup(&mut self) -> AppResult<()> {
        let duration_s = i64::try_from(self.params.warmup_duration_s).unwrap_or(i64::MAX);
        let pause_s = i64::try_from(self.params.warmup_pause_s).unwrap_or(i64::MAX);
        let rate = self.params.warmup_load as u64;
        let load_intensity = i64::try_from(rate).unwrap_or(i64::MAX);
        info!(
            "Warmup: {} s at {} arrivals per second, then {} s pause",
            duration_s, rate, pause_s
        );

        let warmup_start = Instant::now();
        for second in 1..=duration_s {
            let target_ms = second.saturating_mul(1000);
            let current_ms = elapsed_ms(warmup_start);
            let dispatched_ms = self
                .schedule_interval(rate, warmup_start, current_ms, target_ms)
                .await?;
            let reported_s = second.saturating_sub(duration_s).saturating_sub(pause_s);
            self.report(
                reported_s as f64,
                load_intensity,
                dispatched_ms as f64 / 1000.0,
            );
        }
        Ok(())
    }

    async fn pause(&mut self) {
        let pause_s = i64::try_from(self.params.warmup_pause_s).unwrap_or(i64::MAX);
        let pause_start = tokio::time::Instant::now();
        for second in 1..=pause_s {
            let wake_at = pause_start + millis(second.saturating_mul(1000));
            tokio::time::sleep_until(wake_at).await;
            self.report(second.saturating_sub(pause_s) as f64, 0, 0.0);
        }
    }

    async fn measure(
        &mut self,
        profile: &[ArrivalRateTuple],
        time_zero: Instant,
    ) -> AppResult<f64> {
        let mut last_target_ms = 0.0;
        for tuple in profile {
            let current_ms = elapsed_ms(time_zero);
            let target_ms = tuple.target_time_ms();
            let dispatched_ms = self
                .schedule_interval(tuple.target_arrivals(), time_zero, current_ms, target_ms)
                .await?;
            self.report(
                tuple.time_offset_s(),
                tuple.load_intensity(),
                dispatched_ms as f64 / 1000.0,
            );
            last_target_ms = tuple.time_offset_s() * 1000.0;
        }
        Ok(last_target_ms)
    }

    /// Keeps reporting empty one-second intervals until the stragglers finished.
    async fn drain(&mut self, time_zero: Instant, last_target_ms: f64) {
        let mean_wait_ms = self.default_mean_wait_ms;
        let mut next_ms = last_target_ms + 1000.0;
        while self.workers.active_count() > 0 {
            let mut current_ms = elapsed_ms(time_zero);
            while (current_ms as f64) - next_ms < -(mean_wait_ms as f64) {
                tokio::time::sleep(millis(mean_wait_ms)).await;
                current_ms = elapsed_ms(time_zero);
            }
            let next_s = next_ms / 1000.0;
            self.report(next_s, 0, next_s);
            next_ms += 1000.0;
        }
    }

    /// Dispatches `target_arrivals` in batches before `target_ms`.
    ///
    /// Returns the time after the last batch's sleep, relative to `time_zero`.
    async fn schedule_interval(
        &mut self,
        target_arrivals: u64,
        time_zero: Instant,
        current_ms: i64,
        target_ms: i64,
    ) -> AppResult<i64> {
        let mean_wait_ms = effective_mean_wait_ms(
            self.default_mean_wait_ms,
            target_ms,
            current_ms,
            target_arrivals,
        );

        let mut remaining = target_arrivals;
        let mut current_ms = current_ms;
        while remaining > 0 {
            let size = batch_size(target_ms, current_ms, mean_wait_ms, remaining);
            if size > remaining {
                return Err(AppError::scheduler(SchedulerError::Overscheduled {
                    scheduled: target_arrivals
                        .saturating_sub(remaining)
                        .saturating_add(size),
                    target: target_arrivals,
                }));
            }
            self.dispatch_batch(size)?;
            remaining -= size;

            let sleep_ms =
                post_batch_sleep_ms(mean_wait_ms, &mut self.rng, self.params.random_batch_times);
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
            current_ms = elapsed_ms(time_zero);
        }
        Ok(current_ms)
    }

    fn dispatch_batch(&self, size: u64) -> AppResult<()> {
        let enqueued_at = Instant::now();
        for _ in 0..size {
            let transaction = self.transactions.acquire(enqueued_at);
            self.workers.submit(transaction)?;
        }
        Ok(())
    }

    fn report(&self, target_time_s: f64, load_intensity: i64, dispatch_time_s: f64) {
        let snapshot = self.tracker.reset_and_snapshot();
        let result = IntervalResult {
            target_time_s,
            load_intensity,
            successful: snapshot.successful,
            avg_response_time_s: snapshot.avg_response_time_s,
            failed: snapshot.failed,
            dropped: snapshot.dropped,
            dispatch_time_s,
        };
        if self.results.send(result).is_err() {
            debug!("Result receiver gone, dropping interval {}", target_time_s);
        }
    }
}
