pub(crate) const DEFAULT_PROFILE_PATH: &str = "arrivalrates.csv";
pub(crate) const DEFAULT_OUTFILE: &str = "default_log.txt";
pub(crate) const DEFAULT_GENERATOR: &str = "127.0.0.1";
pub(crate) const DEFAULT_SCRIPT_PATH: &str = "http_calls.lua";
pub(crate) const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:24226";

pub(crate) const DEFAULT_SEED: i64 = 5;
pub(crate) const DEFAULT_THREADS: &str = "128";
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 0;
pub(crate) const DEFAULT_WARMUP_RATE: f64 = 0.0;
pub(crate) const DEFAULT_WARMUP_DURATION_S: u64 = 30;
pub(crate) const DEFAULT_WARMUP_PAUSE_S: u64 = 5;

/// Config files picked up by the director when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["loadpace.toml", "loadpace.json"];
