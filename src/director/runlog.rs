use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{AppError, AppResult, ConfigError};
use crate::profile::format_f64;
use crate::protocol::IntervalResult;

pub const RUN_LOG_HEADER: &str = "Target Time,Load Intensity,Successful Transactions,Failed Transactions,Dropped Transactions,Avg Response Time,Final Batch Dispatch Time";

const DATE_FORMAT: &str = "%d.%m.%Y;%H:%M:%S%3f";

/// `dd.MM.yyyy;HH:mm:ssSSS`, as used for the run log date rows.
#[must_use]
pub fn format_date(at: &DateTime<Local>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// CSV run log with one row per aggregated interval.
#[derive(Debug)]
pub struct RunLog<W: Write> {
    writer: W,
}

impl RunLog<BufWriter<File>> {
    /// Creates the file at `path` and writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created or written.
    pub fn create(path: &Path, collectors: &[String]) -> AppResult<Self> {
        let file = File::create(path).map_err(|err| {
            AppError::config(ConfigError::CreateRunLog {
                path: path.to_path_buf(),
                source: err,
            })
        })?;
        Self::new(BufWriter::new(file), collectors)
    }
}

impl<W: Write> RunLog<W> {
    /// Wraps `writer` and writes the header with one `Watts(..)` column per collector.
    ///
    /// # Errors
    ///
    /// Returns an error when writing the header fails.
    pub fn new(mut writer: W, collectors: &[String]) -> AppResult<Self> {
        let mut header = String::from(RUN_LOG_HEADER);
        for name in collectors {
            header.push_str(",Watts(");
            header.push_str(name);
            header.push(')');
        }
        writeln!(writer, "{}", header)?;
        Ok(Self { writer })
    }

    /// Marks the wall clock start of the measurement.
    ///
    /// # Errors
    ///
    /// Returns an error when writing fails.
    pub fn write_date_row(&mut self, at: &DateTime<Local>) -> AppResult<()> {
        writeln!(self.writer, ",{}", format_date(at))?;
        Ok(())
    }

    /// Appends `result` unless it belongs to the warmup (target time <= 0).
    ///
    /// Returns whether a row was written.
    ///
    /// # Errors
    ///
    /// Returns an error when writing fails.
    pub fn write_result(&mut self, result: &IntervalResult, watts: &[f64]) -> AppResult<bool> {
        if result.target_time_s <= 0.0 {
            return Ok(false);
        }
        let mut row = format!(
            "{},{},{},{},{},{},{}",
            format_f64(result.target_time_s),
            result.load_intensity,
            result.successful,
            result.failed,
            result.dropped,
            format_f64(result.avg_response_time_s),
            format_f64(result.dispatch_time_s)
        );
        for value in watts {
            row.push(',');
            row.push_str(&format_f64(*value));
        }
        writeln!(self.writer, "{}", row)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns an error when flushing fails.
    pub fn flush(&mut self) -> AppResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
