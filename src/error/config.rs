use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Config '{field}' must be >= 1.")]
    FieldMustBePositive { field: &'static str },
    #[error("Failed to read arrival rate profile '{path}': {source}")]
    ReadProfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Arrival rate profile '{path}' contains no usable entries.")]
    EmptyProfile { path: PathBuf },
    #[error("Failed to read request script '{path}': {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create run log '{path}': {source}")]
    CreateRunLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No arrival rate profile received before start.")]
    ProfileNotReceived,
    #[error("No request script received before start.")]
    ScriptNotReceived,
    #[error("Request script contains no calls.")]
    ScriptEmpty,
    #[error("No load generator addresses given.")]
    NoGenerators,
}
