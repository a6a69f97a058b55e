use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid number: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid address '{value}'. Expected 'host[:port]'.")]
    InvalidAddress { value: String },
    #[error("Invalid port in '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid telemetry collector '{value}'. Use hioki or tmctld.")]
    InvalidCollector { value: String },
    #[error("Invalid pool mode '{value}'. Use queue or random.")]
    InvalidPoolMode { value: String },
}
