use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, TelemetryError};
use crate::protocol::read_line;

use super::collector::TelemetryCollector;

/// Query/response conventions of a line-based power meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterDialect {
    /// Bytes written for every reading.
    pub query: &'static [u8],
    pub separator: char,
    /// Zero-based index of the field holding the power value.
    pub field: usize,
    /// The field carries a `<label> <value>` pair rather than a bare value.
    pub labelled_value: bool,
    pub poll_interval: Duration,
}

/// Extracts the power value from one response line.
///
/// # Errors
///
/// Returns an error when the field is missing or not a number.
pub fn parse_reading(dialect: &MeterDialect, line: &str) -> Result<f64, TelemetryError> {
    let invalid = || TelemetryError::InvalidReading {
        value: line.to_owned(),
    };
    let field = line
        .split(dialect.separator)
        .nth(dialect.field)
        .map(str::trim)
        .ok_or_else(invalid)?;
    let value = if dialect.labelled_value && field.contains(' ') {
        field.split(' ').nth(1).map(str::trim).ok_or_else(invalid)?
    } else {
        field
    };
    value.parse::<f64>().map_err(|_err| invalid())
}

#[derive(Debug, Default)]
struct Readings {
    sum: f64,
    count: u64,
}

struct Poller {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Collector for meters that answer a text query with one line.
pub struct LineMeterCollector {
    name: String,
    addr: String,
    dialect: MeterDialect,
    readings: Arc<Mutex<Readings>>,
    poller: Option<Poller>,
}

impl LineMeterCollector {
    #[must_use]
    pub fn new(host: &str, port: u16, dialect: MeterDialect) -> Self {
        let addr = format!("{}:{}", host, port);
        Self {
            name: addr.clone(),
            addr,
            dialect,
            readings: Arc::new(Mutex::new(Readings::default())),
            poller: None,
        }
    }
}

#[async_trait]
impl TelemetryCollector for LineMeterCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> AppResult<()> {
        if self.poller.is_some() {
            return Ok(());
        }
        let stream = TcpStream::connect(&self.addr).await.map_err(|err| {
            AppError::telemetry(TelemetryError::Connect {
                addr: self.addr.clone(),
                source: err,
            })
        })?;
        info!("Connected to power meter {}", self.addr);

        let (read_half, write_half) = stream.into_split();
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_meter(
            self.name.clone(),
            self.dialect,
            BufReader::new(read_half),
            write_half,
            Arc::clone(&self.readings),
            stop_rx,
        ));
        self.poller = Some(Poller {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(poller) = self.poller.take() {
            if poller.stop.send(()).is_err() {
                debug!("Power meter poller {} already stopped", self.name);
            }
            if let Err(err) = poller.handle.await {
                warn!("Power meter poller {} failed: {}", self.name, err);
            }
        }
    }

    fn sample(&self) -> f64 {
        let readings = std::mem::take(
            &mut *self
                .readings
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if readings.count == 0 {
            0.0
        } else {
            readings.sum / readings.count as f64
        }
    }
}

async fn poll_meter(
    name: String,
    dialect: MeterDialect,
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    readings: Arc<Mutex<Readings>>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(dialect.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = interval.tick() => {}
        }

        match query_meter(&dialect, &mut reader, &mut writer).await {
            Ok(watts) => {
                let mut guard = readings.lock().unwrap_or_else(PoisonError::into_inner);
                guard.sum += watts;
                guard.count = guard.count.saturating_add(1);
            }
            Err(AppError::Telemetry(TelemetryError::InvalidReading { value })) => {
                debug!("Ignoring power meter {} response '{}'", name, value);
            }
            Err(err) => {
                warn!("Stopped polling power meter {}: {}", name, err);
                break;
            }
        }
    }
    if let Err(err) = writer.shutdown().await {
        debug!("Closing power meter {} failed: {}", name, err);
    }
    info!("Disconnected from power meter {}", name);
}

async fn query_meter(
    dialect: &MeterDialect,
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
) -> AppResult<f64> {
    writer
        .write_all(dialect.query)
        .await
        .map_err(|err| AppError::telemetry(TelemetryError::Query { source: err }))?;
    writer
        .flush()
        .await
        .map_err(|err| AppError::telemetry(TelemetryError::Query { source: err }))?;
    let line = read_line(reader)
        .await?
        .ok_or_else(|| AppError::telemetry(TelemetryError::Closed))?;
    Ok(parse_reading(dialect, &line)?)
}
