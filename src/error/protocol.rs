use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireField {
    #[error("profile count")]
    ProfileCount,
    #[error("thread count")]
    ThreadCount,
    #[error("timeout")]
    Timeout,
    #[error("random batch times")]
    RandomBatchTimes,
    #[error("seed")]
    Seed,
    #[error("warmup duration")]
    WarmupDuration,
    #[error("warmup load")]
    WarmupLoad,
    #[error("warmup pause")]
    WarmupPause,
    #[error("randomize users")]
    RandomizeUsers,
    #[error("target time")]
    TargetTime,
    #[error("target rate")]
    TargetRate,
    #[error("successful transactions")]
    Successful,
    #[error("average response time")]
    AvgResponseTime,
    #[error("failed transactions")]
    Failed,
    #[error("dropped transactions")]
    Dropped,
    #[error("dispatch time")]
    DispatchTime,
    #[error("start timestamp")]
    StartTimestamp,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown command: '{line}'")]
    UnknownCommand { line: String },
    #[error("Missing {field} in '{line}'")]
    MissingField { field: WireField, line: String },
    #[error("Invalid {field} '{value}'")]
    InvalidField { field: WireField, value: String },
    #[error("Connection closed while reading {context}.")]
    UnexpectedEof { context: &'static str },
    #[error("Line exceeded max size ({max} bytes).")]
    LineTooLong { max: usize },
    #[error("Invalid UTF-8 line: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
}
