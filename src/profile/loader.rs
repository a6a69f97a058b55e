use std::path::Path;

use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ConfigError};

use super::tuple::{ArrivalRateTuple, parse_tuples};

/// Loads an arrival rate profile from disk.
///
/// Files that hold no `time,rate` tuples are read again as request time stamp
/// files (one absolute time stamp per line).
///
/// # Errors
///
/// Returns an error when the file cannot be read or yields no entries.
pub fn load_profile_file(path: &Path, offset: f64) -> AppResult<Vec<ArrivalRateTuple>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadProfile {
            path: path.to_path_buf(),
            source: err,
        })
    })?;

    let tuples = parse_tuples(content.lines(), offset);
    if !tuples.is_empty() {
        debug!("Read {} arrival rate tuples from {}", tuples.len(), path.display());
        return Ok(tuples);
    }

    let stamps = parse_request_timestamps(content.lines(), offset);
    if stamps.is_empty() {
        return Err(AppError::config(ConfigError::EmptyProfile {
            path: path.to_path_buf(),
        }));
    }
    debug!("Read {} request time stamps from {}", stamps.len(), path.display());
    Ok(stamps)
}

/// Parses a request time stamp list. Each entry becomes a marker tuple.
pub fn parse_request_timestamps<'line, I>(lines: I, offset: f64) -> Vec<ArrivalRateTuple>
where
    I: IntoIterator<Item = &'line str>,
{
    let mut stamps = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed.strip_suffix(';').unwrap_or(trimmed);
        match value.trim().parse::<f64>() {
            Ok(stamp) => stamps.push(ArrivalRateTuple::request_timestamp(stamp - offset)),
            Err(err) => warn!("Skipping request time stamp '{}': {}", trimmed, err),
        }
    }
    stamps
}

/// Folds request time stamp markers into one-second rate tuples.
///
/// Every time stamp counts towards the bucket that ends at the next full
/// second. Rate tuples pass through unchanged; empty seconds between stamps
/// become zero-rate tuples so reported time stays continuous.
#[must_use]
pub fn bucket_request_timestamps(tuples: &[ArrivalRateTuple]) -> Vec<ArrivalRateTuple> {
    if !tuples.iter().any(|tuple| tuple.is_request_timestamp()) {
        return tuples.to_vec();
    }

    let mut counts: Vec<u64> = Vec::new();
    for tuple in tuples.iter().filter(|tuple| tuple.is_request_timestamp()) {
        let stamp = tuple.time_offset_s();
        if !stamp.is_finite() || stamp < 0.0 {
            continue;
        }
        let bucket = (stamp.floor() as usize).saturating_add(1);
        if counts.len() < bucket {
            counts.resize(bucket, 0);
        }
        if let Some(count) = counts.get_mut(bucket.saturating_sub(1)) {
            *count = count.saturating_add(1);
        }
    }

    counts
        .iter()
        .enumerate()
        .map(|(idx, count)| {
            ArrivalRateTuple::new(idx.saturating_add(1) as f64, *count as f64)
        })
        .collect()
}
