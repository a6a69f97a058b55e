use std::path::PathBuf;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{DirectorArgs, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

/// Applies config values to director arguments not set on the command line.
///
/// `matches` are the `director` subcommand matches.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(
    args: &mut DirectorArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "arrivals")
        && let Some(arrivals) = config.arrivals.as_ref()
    {
        args.arrivals = PathBuf::from(arrivals);
    }

    if !is_cli(matches, "outfile")
        && let Some(outfile) = config.outfile.clone()
    {
        args.outfile = outfile;
    }

    if !is_cli(matches, "generators")
        && let Some(generators) = config.generators.clone()
    {
        args.generators = generators;
    }

    if !is_cli(matches, "seed")
        && let Some(seed) = config.seed
    {
        args.seed = seed;
    }

    if !is_cli(matches, "threads")
        && let Some(threads) = config.threads
    {
        args.threads = ensure_positive_usize(threads, "threads")?;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout
    {
        args.timeout = timeout;
    }

    if !is_cli(matches, "script")
        && let Some(script) = config.script.as_ref()
    {
        args.script = PathBuf::from(script);
    }

    if !is_cli(matches, "warmup_rate")
        && let Some(rate) = config.warmup_rate
    {
        args.warmup_rate = rate;
    }

    if !is_cli(matches, "warmup_duration")
        && let Some(duration) = config.warmup_duration
    {
        args.warmup_duration = duration;
    }

    if !is_cli(matches, "warmup_pause")
        && let Some(pause) = config.warmup_pause
    {
        args.warmup_pause = pause;
    }

    if !is_cli(matches, "randomize_users")
        && let Some(randomize) = config.randomize_users
    {
        args.randomize_users = randomize;
    }

    if !is_cli(matches, "power")
        && let Some(power) = config.power.clone()
    {
        args.power = power;
    }

    if !is_cli(matches, "power_collector")
        && let Some(kind) = config.power_collector
    {
        args.power_collector = Some(kind);
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_usize(value: usize, field: &'static str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value)
        .map_err(|_err| AppError::config(ConfigError::FieldMustBePositive { field }))
}
