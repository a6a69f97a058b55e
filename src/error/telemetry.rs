use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to connect to power meter {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Power meter query failed: {source}")]
    Query {
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid power meter reading '{value}'.")]
    InvalidReading { value: String },
    #[error("Power meter closed the connection.")]
    Closed,
}
