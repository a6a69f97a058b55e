use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::telemetry::TelemetryKind;

use super::defaults::{
    DEFAULT_GENERATOR, DEFAULT_LISTEN_ADDR, DEFAULT_OUTFILE, DEFAULT_PROFILE_PATH,
    DEFAULT_SCRIPT_PATH, DEFAULT_SEED, DEFAULT_THREADS, DEFAULT_TIMEOUT_MS,
    DEFAULT_WARMUP_DURATION_S, DEFAULT_WARMUP_PAUSE_S, DEFAULT_WARMUP_RATE,
};
use super::parsers::parse_positive_usize;
use super::types::PositiveUsize;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Distributed HTTP load generator that tracks a time-varying arrival rate profile."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (overridden by LOADPACE_LOG / RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive one or more load generators and write the run log
    Director(DirectorArgs),
    /// Serve as a load generator node for a director
    #[command(name = "loadgenerator", alias = "generator")]
    LoadGenerator(LoadGeneratorArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DirectorArgs {
    /// Arrival rate profile (`time,rate` lines or request time stamps)
    #[arg(long = "arrivals", short = 'a', default_value = DEFAULT_PROFILE_PATH)]
    pub arrivals: PathBuf,

    /// Run log file name, placed next to the profile
    #[arg(long = "outfile", short = 'o', default_value = DEFAULT_OUTFILE)]
    pub outfile: String,

    /// Load generator addresses (`host[:port]`, comma separated)
    #[arg(
        long = "generator",
        short = 's',
        value_delimiter = ',',
        default_value = DEFAULT_GENERATOR
    )]
    pub generators: Vec<String>,

    /// Seed for randomized batch waits; values <= 0 disable randomization
    #[arg(long, short = 'r', default_value_t = DEFAULT_SEED, allow_hyphen_values = true)]
    pub seed: i64,

    /// Worker threads per load generator
    #[arg(long, short = 't', default_value = DEFAULT_THREADS, value_parser = parse_positive_usize)]
    pub threads: PositiveUsize,

    /// Request timeout in milliseconds (0 disables the timeout)
    #[arg(long, short = 'u', default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Request script sent to every load generator
    #[arg(long, short = 'l', default_value = DEFAULT_SCRIPT_PATH)]
    pub script: PathBuf,

    /// Constant warmup rate (arrivals per second); below 1 skips the warmup
    #[arg(long = "warmup-rate", alias = "wr", default_value_t = DEFAULT_WARMUP_RATE)]
    pub warmup_rate: f64,

    /// Warmup duration in seconds
    #[arg(long = "warmup-duration", alias = "wd", default_value_t = DEFAULT_WARMUP_DURATION_S)]
    pub warmup_duration: u64,

    /// Pause between warmup and measurement in seconds
    #[arg(long = "warmup-pause", alias = "wp", default_value_t = DEFAULT_WARMUP_PAUSE_S)]
    pub warmup_pause: u64,

    /// Hand out request sources in random order instead of round robin
    #[arg(long = "randomize-users")]
    pub randomize_users: bool,

    /// Power meter addresses (`host[:port]`, comma separated)
    #[arg(long = "power", short = 'p', value_delimiter = ',')]
    pub power: Vec<String>,

    /// Power meter kind
    #[arg(long = "power-collector", short = 'c', value_enum, ignore_case = true)]
    pub power_collector: Option<TelemetryKind>,

    /// Config file (TOML or JSON) for options not given on the command line
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct LoadGeneratorArgs {
    /// Address to accept directors on
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: String,

    /// Exit after serving a single director
    #[arg(long)]
    pub once: bool,
}
