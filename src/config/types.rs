use serde::Deserialize;

use crate::telemetry::TelemetryKind;

/// Director options readable from `loadpace.toml` / `loadpace.json`.
///
/// Every field mirrors a `director` flag; values given on the command line win.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub arrivals: Option<String>,
    pub outfile: Option<String>,
    #[serde(alias = "generator")]
    pub generators: Option<Vec<String>>,
    pub seed: Option<i64>,
    pub threads: Option<usize>,
    pub timeout: Option<u64>,
    pub script: Option<String>,
    pub warmup_rate: Option<f64>,
    pub warmup_duration: Option<u64>,
    pub warmup_pause: Option<u64>,
    pub randomize_users: Option<bool>,
    pub power: Option<Vec<String>>,
    pub power_collector: Option<TelemetryKind>,
}
