use async_trait::async_trait;

use crate::error::AppResult;

/// A power source polled in the background.
#[async_trait]
pub trait TelemetryCollector: Send + Sync {
    /// Label used for the `Watts(<name>)` run log column.
    fn name(&self) -> &str;

    /// Connects and starts polling.
    ///
    /// # Errors
    ///
    /// Returns an error when the device cannot be reached.
    async fn start(&mut self) -> AppResult<()>;

    /// Stops polling and closes the connection.
    async fn stop(&mut self);

    /// Average of the readings gathered since the previous sample, `0.0` if none.
    fn sample(&self) -> f64;
}
