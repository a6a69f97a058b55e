//! Director: drives the load generators and writes the run log.
//!
//! The director sends the (per node divided) profile, worker count, timeout
//! and request script to every generator, starts them together and then
//! merges one interval result per node into each run log row, optionally
//! with power readings.
mod aggregate;
mod communicator;
mod runlog;


use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use futures_util::future::try_join_all;
use tracing::{error, info};

use crate::args::{DirectorArgs, parse_address, socket_address};
use crate::error::{AppError, AppResult, ConfigError, DistributedError};
use crate::profile::{ArrivalRateTuple, bucket_request_timestamps, load_profile_file};
use crate::protocol::{DEFAULT_GENERATOR_PORT, IntervalResult, StartParams};
use crate::telemetry::{TelemetryCollector, TelemetryKind, build_collectors, start_collectors};

pub use aggregate::{RoundOutcome, collect_round, merge_results};
pub use communicator::{GeneratorCommunicator, NextResult};
pub use runlog::{RUN_LOG_HEADER, RunLog, format_date};

/// How long a round waits for each generator before skipping it.
pub const DEFAULT_RESULT_WAIT: Duration = Duration::from_secs(5);

/// Everything a director run needs, resolved from CLI and config file.
#[derive(Debug, Clone)]
pub struct DirectorSettings {
    pub profile_path: PathBuf,
    pub outfile: String,
    pub generators: Vec<String>,
    pub seed: i64,
    pub threads: usize,
    pub timeout_ms: u64,
    pub script_path: PathBuf,
    pub warmup_rate: f64,
    pub warmup_duration_s: u64,
    pub warmup_pause_s: u64,
    pub randomize_users: bool,
    pub power: Vec<String>,
    pub power_collector: Option<TelemetryKind>,
    pub result_wait: Duration,
}

impl From<DirectorArgs> for DirectorSettings {
    fn from(args: DirectorArgs) -> Self {
        Self {
            profile_path: args.arrivals,
            outfile: args.outfile,
            generators: args.generators,
            seed: args.seed,
            threads: args.threads.get(),
            timeout_ms: args.timeout,
            script_path: args.script,
            warmup_rate: args.warmup_rate,
            warmup_duration_s: args.warmup_duration,
            warmup_pause_s: args.warmup_pause,
            randomize_users: args.randomize_users,
            power: args.power,
            power_collector: args.power_collector,
            result_wait: DEFAULT_RESULT_WAIT,
        }
    }
}

impl DirectorSettings {
    /// Seeds above zero turn on randomized batch waits.
    #[must_use]
    pub const fn start_params(&self) -> StartParams {
        StartParams {
            random_batch_times: self.seed > 0,
            seed: self.seed,
            warmup_duration_s: self.warmup_duration_s,
            warmup_load: self.warmup_rate,
            warmup_pause_s: self.warmup_pause_s,
            randomize_users: self.randomize_users,
        }
    }

    /// The run log lives next to the profile.
    #[must_use]
    pub fn run_log_path(&self) -> PathBuf {
        let parent = self
            .profile_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        parent.join(&self.outfile)
    }
}

/// Runs one complete measurement and returns the path of the run log.
///
/// # Errors
///
/// Returns an error when the profile or script cannot be read, a generator is
/// unreachable or rejects the run, or the run log cannot be written.
pub async fn run_director(settings: &DirectorSettings) -> AppResult<PathBuf> {
    let profile = bucket_request_timestamps(&load_profile_file(&settings.profile_path, 0.0)?);
    info!("Read {} Arrival Rate Tuples", profile.len());
    let script = read_script(&settings.script_path)?;

    let mut communicators = connect_all(&settings.generators).await?;
    configure_all(&mut communicators, settings, &profile, &script).await?;

    let run_log_path = settings.run_log_path();
    let collectors =
        start_collectors(build_collectors(settings.power_collector, &settings.power)?).await;
    let names: Vec<String> = collectors
        .iter()
        .map(|collector| collector.name().to_owned())
        .collect();
    let mut run_log = RunLog::create(&run_log_path, &names)?;

    info!("Starting Load Generation");
    let params = settings.start_params();
    let epochs = try_join_all(
        communicators
            .iter_mut()
            .map(|communicator| communicator.start(params)),
    )
    .await?;
    let epoch_ms = epochs
        .iter()
        .copied()
        .min()
        .unwrap_or_else(|| Local::now().timestamp_millis());
    let time_zero = local_time(epoch_ms);
    info!("Beginning Run @{}({})", epoch_ms, format_date(&time_zero));
    if !params.has_warmup() {
        run_log.write_date_row(&time_zero)?;
    }

    let outcome = record_rounds(&mut communicators, settings, &mut run_log, &collectors).await;
    let flushed = run_log.flush();
    for mut collector in collectors {
        collector.stop().await;
    }
    if let Err(err) = outcome {
        error!("Run failed: {}", err);
        for communicator in communicators {
            communicator.abort().await;
        }
        return Err(err);
    }

    info!("Workload finished.");
    for communicator in communicators {
        communicator.close().await;
    }
    flushed?;
    info!("Log finished: {}", run_log_path.display());
    Ok(run_log_path)
}

async fn record_rounds(
    communicators: &mut [GeneratorCommunicator],
    settings: &DirectorSettings,
    run_log: &mut RunLog<impl std::io::Write>,
    collectors: &[Box<dyn TelemetryCollector>],
) -> AppResult<()> {
    loop {
        let row = match collect_round(communicators, settings.result_wait).await {
            RoundOutcome::Row(row) => row,
            RoundOutcome::Empty => continue,
            RoundOutcome::Concluded => return Ok(()),
            RoundOutcome::Failed { addr, message } => {
                return Err(AppError::distributed(DistributedError::Remote {
                    message: format!("{}: {}", addr, message),
                }));
            }
        };
        // Only runs with a warmup report target time 0, right before measuring.
        if row.target_time_s.abs() < f64::EPSILON {
            let now = Local::now();
            info!(
                "Starting Measurement @{}({})",
                now.timestamp_millis(),
                format_date(&now)
            );
            run_log.write_date_row(&now)?;
        }
        log_row(run_log, &row, collectors)?;
    }
}

fn read_script(path: &Path) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadScript {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    Ok(content.lines().map(str::to_owned).collect())
}

async fn connect_all(generators: &[String]) -> AppResult<Vec<GeneratorCommunicator>> {
    let addresses = generators
        .iter()
        .map(|generator| generator.trim())
        .filter(|generator| !generator.is_empty())
        .map(|generator| {
            parse_address(generator, DEFAULT_GENERATOR_PORT)
                .map(|(host, port)| socket_address(&host, port))
                .map_err(AppError::validation)
        })
        .collect::<AppResult<Vec<String>>>()?;
    if addresses.is_empty() {
        return Err(AppError::config(ConfigError::NoGenerators));
    }
    try_join_all(
        addresses
            .iter()
            .map(String::as_str)
            .map(GeneratorCommunicator::connect),
    )
    .await
}

async fn configure_all(
    communicators: &mut [GeneratorCommunicator],
    settings: &DirectorSettings,
    profile: &[ArrivalRateTuple],
    script: &[String],
) -> AppResult<()> {
    let nodes = communicators.len();
    try_join_all(
        communicators
            .iter_mut()
            .map(|communicator| communicator.send_profile(profile, nodes)),
    )
    .await?;
    info!("Arrival Rates sent to Load Generator(s).");

    try_join_all(
        communicators
            .iter_mut()
            .map(|communicator| communicator.send_thread_count(settings.threads)),
    )
    .await?;
    info!("Thread Count sent to Load Generator(s): {}", settings.threads);

    try_join_all(
        communicators
            .iter_mut()
            .map(|communicator| communicator.send_timeout(settings.timeout_ms)),
    )
    .await?;
    if settings.timeout_ms > 0 {
        info!(
            "URL connection timeout sent to Load Generator(s): {}",
            settings.timeout_ms
        );
    }

    try_join_all(
        communicators
            .iter_mut()
            .map(|communicator| communicator.send_script(script)),
    )
    .await?;
    info!(
        "Contents of script sent to Load Generator(s): {}",
        settings.script_path.display()
    );
    Ok(())
}

fn log_row(
    run_log: &mut RunLog<impl std::io::Write>,
    row: &IntervalResult,
    collectors: &[Box<dyn TelemetryCollector>],
) -> AppResult<()> {
    let watts: Vec<f64> = collectors.iter().map(|collector| collector.sample()).collect();
    info!(
        "Target Time = {}; Load Intensity = {}; #Success = {}; #Failed = {}; #Dropped = {}",
        row.target_time_s, row.load_intensity, row.successful, row.failed, row.dropped
    );
    run_log.write_result(row, &watts)?;
    Ok(())
}

fn local_time(epoch_ms: i64) -> DateTime<Local> {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .unwrap_or_else(Local::now)
}
