use crate::error::{ProtocolError, WireField};
use crate::profile::format_f64;

const PROFILE_PREFIX: &str = "dlim,";
const THREADS_PREFIX: &str = "threadnum:";
const TIMEOUT_PREFIX: &str = "timout:";
const SCRIPT: &str = "luascript";
const RESULTS: &str = "results";
const START: &str = "start";

/// Run parameters carried by the `start` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartParams {
    pub random_batch_times: bool,
    pub seed: i64,
    pub warmup_duration_s: u64,
    pub warmup_load: f64,
    pub warmup_pause_s: u64,
    pub randomize_users: bool,
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            random_batch_times: false,
            seed: 5,
            warmup_duration_s: 0,
            warmup_load: 0.0,
            warmup_pause_s: 0,
            randomize_users: false,
        }
    }
}

impl StartParams {
    /// Warmup runs only with a positive duration and a load of at least one arrival.
    #[must_use]
    pub fn has_warmup(&self) -> bool {
        self.warmup_duration_s > 0 && self.warmup_load >= 1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Announces `count` profile lines that follow.
    Profile { count: usize },
    ThreadCount(usize),
    TimeoutMs(u64),
    /// Opens a request script block closed by the script terminator line.
    Script,
    Results,
    Start(StartParams),
}

impl Command {
    /// Parses a single command line.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown commands and malformed arguments.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if let Some(count) = line.strip_prefix(PROFILE_PREFIX) {
            return Ok(Self::Profile {
                count: parse_number(count, WireField::ProfileCount)?,
            });
        }
        if let Some(threads) = line.strip_prefix(THREADS_PREFIX) {
            return Ok(Self::ThreadCount(parse_number(
                threads,
                WireField::ThreadCount,
            )?));
        }
        if let Some(timeout) = line.strip_prefix(TIMEOUT_PREFIX) {
            return Ok(Self::TimeoutMs(parse_number(timeout, WireField::Timeout)?));
        }
        if line == SCRIPT {
            return Ok(Self::Script);
        }
        if line == RESULTS {
            return Ok(Self::Results);
        }
        if Self::is_start(line) {
            return parse_start(line).map(Self::Start);
        }
        Err(ProtocolError::UnknownCommand {
            line: line.to_owned(),
        })
    }

    /// Whether `line` is meant as a configuration command the director waits
    /// an `ok` for, even when its argument does not parse.
    #[must_use]
    pub fn expects_ack(line: &str) -> bool {
        let line = line.trim();
        [PROFILE_PREFIX, THREADS_PREFIX, TIMEOUT_PREFIX]
            .iter()
            .any(|prefix| line.starts_with(prefix))
    }

    /// Whether `line` is meant as a `start` command.
    #[must_use]
    pub fn is_start(line: &str) -> bool {
        let line = line.trim();
        line == START || line.starts_with("start,")
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::Profile { count } => format!("{}{}", PROFILE_PREFIX, count),
            Self::ThreadCount(threads) => format!("{}{}", THREADS_PREFIX, threads),
            Self::TimeoutMs(timeout) => format!("{}{}", TIMEOUT_PREFIX, timeout),
            Self::Script => SCRIPT.to_owned(),
            Self::Results => RESULTS.to_owned(),
            Self::Start(params) => format!(
                "{},{},{},{},{},{},{}",
                START,
                params.random_batch_times,
                params.seed,
                params.warmup_duration_s,
                format_f64(params.warmup_load),
                params.warmup_pause_s,
                params.randomize_users
            ),
        }
    }

    /// Short name used in log and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Profile { .. } => "profile",
            Self::ThreadCount(_) => "thread count",
            Self::TimeoutMs(_) => "timeout",
            Self::Script => "script",
            Self::Results => "results",
            Self::Start(_) => "start",
        }
    }
}

fn parse_start(line: &str) -> Result<StartParams, ProtocolError> {
    let mut fields = line.split(',').skip(1);
    let mut next = |field: WireField| {
        fields
            .next()
            .map(str::trim)
            .ok_or_else(|| ProtocolError::MissingField {
                field,
                line: line.to_owned(),
            })
    };

    let random_batch_times = parse_bool(
        next(WireField::RandomBatchTimes)?,
        WireField::RandomBatchTimes,
    )?;
    let seed = parse_number(next(WireField::Seed)?, WireField::Seed)?;
    let warmup_duration_s = parse_seconds(
        next(WireField::WarmupDuration)?,
        WireField::WarmupDuration,
    )?;
    let warmup_load = parse_float(next(WireField::WarmupLoad)?, WireField::WarmupLoad)?;
    let warmup_pause_s = parse_seconds(next(WireField::WarmupPause)?, WireField::WarmupPause)?;
    let randomize_users = parse_bool(
        next(WireField::RandomizeUsers)?,
        WireField::RandomizeUsers,
    )?;

    Ok(StartParams {
        random_batch_times,
        seed,
        warmup_duration_s,
        warmup_load,
        warmup_pause_s,
        randomize_users,
    })
}

pub(super) fn parse_number<T>(value: &str, field: WireField) -> Result<T, ProtocolError>
where
    T: std::str::FromStr,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|_err| ProtocolError::InvalidField {
            field,
            value: value.to_owned(),
        })
}

pub(super) fn parse_float(value: &str, field: WireField) -> Result<f64, ProtocolError> {
    parse_number::<f64>(value, field)
}

// Negative durations disable the phase they belong to.
fn parse_seconds(value: &str, field: WireField) -> Result<u64, ProtocolError> {
    let seconds = parse_number::<i64>(value, field)?;
    Ok(u64::try_from(seconds).unwrap_or(0))
}

fn parse_bool(value: &str, field: WireField) -> Result<bool, ProtocolError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ProtocolError::InvalidField {
            field,
            value: value.to_owned(),
        })
    }
}
