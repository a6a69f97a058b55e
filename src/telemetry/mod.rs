//! Power meter telemetry sampled alongside every run log row.
mod collector;
mod meter;
mod registry;

#[cfg(test)]
mod tests;

pub use collector::TelemetryCollector;
pub use meter::{LineMeterCollector, MeterDialect, parse_reading};
pub use registry::{DEFAULT_TELEMETRY_PORT, TelemetryKind, build_collectors, start_collectors};
