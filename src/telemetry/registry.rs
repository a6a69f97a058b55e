use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::args::parse_address;
use crate::error::{AppError, AppResult};

use super::collector::TelemetryCollector;
use super::meter::{LineMeterCollector, MeterDialect};

/// Port used for power meter addresses given without one.
pub const DEFAULT_TELEMETRY_PORT: u16 = 22444;

const HIOKI_PORT: u16 = 3300;

const HIOKI: MeterDialect = MeterDialect {
    query: b":MEAS:POW?\n",
    separator: ';',
    field: 2,
    labelled_value: true,
    poll_interval: Duration::from_millis(250),
};

const TMCTLD: MeterDialect = MeterDialect {
    query: b"measure\n\0",
    separator: ',',
    field: 2,
    labelled_value: false,
    poll_interval: Duration::from_millis(100),
};

/// Supported power meter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    /// HIOKI power analyzer speaking its SCPI-style query.
    Hioki,
    /// `tmctld` daemon in front of a Yokogawa meter.
    Tmctld,
}

impl TelemetryKind {
    #[must_use]
    pub const fn dialect(self) -> MeterDialect {
        match self {
            Self::Hioki => HIOKI,
            Self::Tmctld => TMCTLD,
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Hioki => HIOKI_PORT,
            Self::Tmctld => DEFAULT_TELEMETRY_PORT,
        }
    }

    #[must_use]
    pub fn collector(self, host: &str, port: u16) -> Box<dyn TelemetryCollector> {
        Box::new(LineMeterCollector::new(host, port, self.dialect()))
    }
}

/// Creates one collector per address.
///
/// A kind without addresses, or addresses without a kind, disables power
/// measurement with a warning.
///
/// # Errors
///
/// Returns an error when an address is malformed.
pub fn build_collectors(
    kind: Option<TelemetryKind>,
    addresses: &[String],
) -> AppResult<Vec<Box<dyn TelemetryCollector>>> {
    let addresses: Vec<&str> = addresses
        .iter()
        .map(|address| address.trim())
        .filter(|address| !address.is_empty())
        .collect();

    let Some(kind) = kind else {
        if !addresses.is_empty() {
            warn!(
                "Power meter address given but no collector kind. No power measurements will be performed."
            );
        }
        return Ok(Vec::new());
    };
    if addresses.is_empty() {
        warn!(
            "Power collector given but no power meter address. No power measurements will be performed."
        );
        return Ok(Vec::new());
    }

    let mut collectors = Vec::with_capacity(addresses.len());
    for address in addresses {
        let (host, port) = parse_address(address, kind.default_port())
            .map_err(AppError::validation)?;
        info!("Power collector {:?} for {}:{}", kind, host, port);
        collectors.push(kind.collector(&host, port));
    }
    Ok(collectors)
}

/// Starts every collector, keeping only those that connected.
pub async fn start_collectors(
    collectors: Vec<Box<dyn TelemetryCollector>>,
) -> Vec<Box<dyn TelemetryCollector>> {
    let mut started = Vec::with_capacity(collectors.len());
    for mut collector in collectors {
        match collector.start().await {
            Ok(()) => started.push(collector),
            Err(err) => error!("Skipping power collector {}: {}", collector.name(), err),
        }
    }
    started
}
