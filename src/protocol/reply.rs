use crate::error::{ProtocolError, WireField};
use crate::profile::format_f64;

use super::command::{parse_float, parse_number};
use super::{ACK, DONE, ERROR_PREFIX};

/// One reporting tick of a single load generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalResult {
    /// Deadline of the reported interval in seconds after time zero.
    pub target_time_s: f64,
    pub load_intensity: i64,
    pub successful: u64,
    pub avg_response_time_s: f64,
    pub failed: u64,
    pub dropped: u64,
    /// Time of the final batch dispatch in seconds after time zero.
    pub dispatch_time_s: f64,
}

impl IntervalResult {
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            format_f64(self.target_time_s),
            self.load_intensity,
            self.successful,
            format_f64(self.avg_response_time_s),
            self.failed,
            self.dropped,
            format_f64(self.dispatch_time_s)
        )
    }

    /// Parses `targetTime,rate,success,avgResp,failed,dropped,dispatchTime`.
    ///
    /// # Errors
    ///
    /// Returns an error when a field is missing or not a number.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut fields = line.trim().split(',');
        let mut next = |field: WireField| {
            fields.next().ok_or_else(|| ProtocolError::MissingField {
                field,
                line: line.to_owned(),
            })
        };

        let target_time_s = parse_float(next(WireField::TargetTime)?, WireField::TargetTime)?;
        let load_intensity = parse_load_intensity(next(WireField::TargetRate)?)?;
        let successful = parse_number(next(WireField::Successful)?, WireField::Successful)?;
        let avg_response_time_s =
            parse_float(next(WireField::AvgResponseTime)?, WireField::AvgResponseTime)?;
        let failed = parse_number(next(WireField::Failed)?, WireField::Failed)?;
        let dropped = parse_number(next(WireField::Dropped)?, WireField::Dropped)?;
        let dispatch_time_s = parse_float(next(WireField::DispatchTime)?, WireField::DispatchTime)?;

        Ok(Self {
            target_time_s,
            load_intensity,
            successful,
            avg_response_time_s,
            failed,
            dropped,
            dispatch_time_s,
        })
    }
}

// Older generators print the rate as a float.
fn parse_load_intensity(value: &str) -> Result<i64, ProtocolError> {
    if let Ok(rate) = value.trim().parse::<i64>() {
        return Ok(rate);
    }
    let rate = parse_float(value, WireField::TargetRate)?;
    Ok(rate as i64)
}

/// Lines a load generator sends back to the director.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    /// Wall clock epoch milliseconds at which the generator's time zero lies.
    StartTimestamp(i64),
    Interval(IntervalResult),
    Done,
    Error(String),
}

impl Reply {
    /// Classifies a reply line.
    ///
    /// # Errors
    ///
    /// Returns an error when the line matches no known reply.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line == ACK {
            return Ok(Self::Ok);
        }
        if line == DONE {
            return Ok(Self::Done);
        }
        if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
            return Ok(Self::Error(message.trim().to_owned()));
        }
        if line.contains(',') {
            return IntervalResult::parse(line).map(Self::Interval);
        }
        parse_number::<i64>(line, WireField::StartTimestamp).map(Self::StartTimestamp)
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::Ok => ACK.to_owned(),
            Self::StartTimestamp(epoch_ms) => epoch_ms.to_string(),
            Self::Interval(result) => result.to_line(),
            Self::Done => DONE.to_owned(),
            Self::Error(message) => format!("{} {}", ERROR_PREFIX, message),
        }
    }
}
