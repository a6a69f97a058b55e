use std::time::Duration;

use tracing::{debug, error};

use crate::protocol::IntervalResult;

use super::communicator::{GeneratorCommunicator, NextResult};

/// Outcome of one aggregation round across all load generators.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Merged result of every node that reported this round.
    Row(IntervalResult),
    /// No node reported, but some are still running.
    Empty,
    /// Every node has finished.
    Concluded,
    /// A node aborted its run.
    Failed { addr: String, message: String },
}

/// Merges one round of interval results into a single row.
///
/// Counts and load intensities are summed, the response time is the mean of
/// the reported averages and the dispatch time is the latest one. The target
/// time is taken from the first result; differing target times are logged as
/// an invalid measurement.
#[must_use]
pub fn merge_results(results: &[IntervalResult]) -> Option<IntervalResult> {
    let (first, rest) = results.split_first()?;
    let mut merged = *first;
    for result in rest {
        if (result.target_time_s - first.target_time_s).abs() > f64::EPSILON {
            error!(
                "Time mismatch in load generator responses ({} vs {})! Measurement invalid.",
                first.target_time_s, result.target_time_s
            );
        }
        merged.load_intensity = merged.load_intensity.saturating_add(result.load_intensity);
        merged.successful = merged.successful.saturating_add(result.successful);
        merged.failed = merged.failed.saturating_add(result.failed);
        merged.dropped = merged.dropped.saturating_add(result.dropped);
        merged.avg_response_time_s += result.avg_response_time_s;
        merged.dispatch_time_s = merged.dispatch_time_s.max(result.dispatch_time_s);
    }
    merged.avg_response_time_s /= results.len() as f64;
    Some(merged)
}

/// Polls every unfinished communicator once, waiting at most `wait` for each.
///
/// Stops at the first node that reports a failure.
pub async fn collect_round(
    communicators: &mut [GeneratorCommunicator],
    wait: Duration,
) -> RoundOutcome {
    let mut results = Vec::with_capacity(communicators.len());
    for communicator in communicators.iter_mut() {
        if communicator.is_finished() {
            continue;
        }
        match communicator.next_result(wait).await {
            NextResult::Interval(result) => results.push(result),
            NextResult::TimedOut => {
                debug!(
                    "No result from {} within {:?}, skipping it this round",
                    communicator.addr(),
                    wait
                );
            }
            NextResult::Failed(message) => {
                return RoundOutcome::Failed {
                    addr: communicator.addr().to_owned(),
                    message,
                };
            }
            NextResult::Finished => debug!("Load generator {} finished", communicator.addr()),
        }
    }

    if let Some(row) = merge_results(&results) {
        return RoundOutcome::Row(row);
    }
    if communicators.iter().all(GeneratorCommunicator::is_finished) {
        RoundOutcome::Concluded
    } else {
        RoundOutcome::Empty
    }
}
