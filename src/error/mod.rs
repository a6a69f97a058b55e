mod app;
mod config;
mod distributed;
mod http;
mod protocol;
mod scheduler;
mod telemetry;
mod validation;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use distributed::DistributedError;
pub use http::HttpError;
pub use protocol::{ProtocolError, WireField};
pub use scheduler::SchedulerError;
pub use telemetry::TelemetryError;
pub use validation::ValidationError;
