use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, DistributedError};
use crate::profile::ArrivalRateTuple;
use crate::protocol::{
    Command, IntervalResult, Reply, SCRIPT_TERMINATOR, StartParams, read_valid_line, write_line,
    write_lines,
};

/// Result of polling a communicator for its next interval.
#[derive(Debug, Clone, PartialEq)]
pub enum NextResult {
    Interval(IntervalResult),
    /// Nothing arrived within the wait; the generator is still running.
    TimedOut,
    /// The generator aborted the run with this error message.
    Failed(String),
    /// The generator sent `done` or the connection is gone.
    Finished,
}

/// What the background reader forwards after `start`.
#[derive(Debug)]
enum GeneratorEvent {
    Interval(IntervalResult),
    Failed(String),
}

/// Director side of one load generator connection.
///
/// Configuration commands are synchronous: each waits for the generator's
/// `ok`. After [`GeneratorCommunicator::start`] a background task reads
/// interval lines into a queue until `done` or EOF. An `Error:` line after the
/// start timestamp means the generator aborted the run.
#[derive(Debug)]
pub struct GeneratorCommunicator {
    addr: String,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    results: Option<mpsc::UnboundedReceiver<GeneratorEvent>>,
    reader_task: Option<JoinHandle<()>>,
    finished: bool,
}

impl GeneratorCommunicator {
    /// Connects to a load generator at `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established.
    pub async fn connect(addr: &str) -> AppResult<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|err| {
            AppError::distributed(DistributedError::Connection {
                addr: addr.to_owned(),
                source: err,
            })
        })?;
        if let Err(err) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, err);
        }
        info!("Connected to load generator {}", addr);
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            addr: addr.to_owned(),
            reader: Some(BufReader::new(read_half)),
            writer,
            results: None,
            reader_task: None,
            finished: false,
        })
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends the profile with every rate divided by `divisor`.
    ///
    /// # Errors
    ///
    /// Returns an error when sending fails or the generator does not acknowledge.
    pub async fn send_profile(
        &mut self,
        profile: &[ArrivalRateTuple],
        divisor: usize,
    ) -> AppResult<()> {
        let mut lines = Vec::with_capacity(profile.len().saturating_add(1));
        lines.push(
            Command::Profile {
                count: profile.len(),
            }
            .to_line(),
        );
        lines.extend(
            profile
                .iter()
                .map(|tuple| tuple.divided(divisor).to_wire_line()),
        );
        write_lines(&mut self.writer, lines.iter().map(String::as_str)).await?;
        self.wait_for_ack("arrival rates").await
    }

    /// # Errors
    ///
    /// Returns an error when sending fails or the generator does not acknowledge.
    pub async fn send_thread_count(&mut self, threads: usize) -> AppResult<()> {
        self.send_command(&Command::ThreadCount(threads)).await
    }

    /// # Errors
    ///
    /// Returns an error when sending fails or the generator does not acknowledge.
    pub async fn send_timeout(&mut self, timeout_ms: u64) -> AppResult<()> {
        self.send_command(&Command::TimeoutMs(timeout_ms)).await
    }

    /// Sends the request script followed by its terminator line.
    ///
    /// # Errors
    ///
    /// Returns an error when sending fails or the generator does not acknowledge.
    pub async fn send_script(&mut self, script: &[String]) -> AppResult<()> {
        let header = Command::Script.to_line();
        let lines = std::iter::once(header.as_str())
            .chain(script.iter().map(String::as_str))
            .chain(std::iter::once(SCRIPT_TERMINATOR));
        write_lines(&mut self.writer, lines).await?;
        self.wait_for_ack("request script").await
    }

    /// Starts the run and returns the generator's start epoch in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when the generator closes the connection or answers
    /// with an error instead of the start timestamp.
    pub async fn start(&mut self, params: StartParams) -> AppResult<i64> {
        write_line(&mut self.writer, &Command::Start(params).to_line()).await?;
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| AppError::distributed(DistributedError::ConnectionClosed))?;

        let epoch_ms = loop {
            let Some(line) = read_valid_line(&mut reader).await? else {
                self.finished = true;
                return Err(AppError::distributed(DistributedError::MissingAck {
                    addr: self.addr.clone(),
                    command: "start",
                }));
            };
            match Reply::parse(&line) {
                Ok(Reply::StartTimestamp(epoch_ms)) => break epoch_ms,
                Ok(Reply::Error(message)) => {
                    self.finished = true;
                    return Err(AppError::distributed(DistributedError::Remote { message }));
                }
                Ok(other) => debug!("Ignoring {:?} from {} before start", other, self.addr),
                Err(err) => warn!("Ignoring line from {}: {}", self.addr, err),
            }
        };

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        self.reader_task = Some(tokio::spawn(read_results(
            reader,
            results_tx,
            self.addr.clone(),
        )));
        self.results = Some(results_rx);
        Ok(epoch_ms)
    }

    /// Waits up to `wait` for the next interval result.
    ///
    /// A reported failure finishes the communicator.
    pub async fn next_result(&mut self, wait: Duration) -> NextResult {
        if self.finished {
            return NextResult::Finished;
        }
        let Some(results) = self.results.as_mut() else {
            return NextResult::Finished;
        };
        match tokio::time::timeout(wait, results.recv()).await {
            Ok(Some(GeneratorEvent::Interval(result))) => NextResult::Interval(result),
            Ok(Some(GeneratorEvent::Failed(message))) => {
                self.finished = true;
                NextResult::Failed(message)
            }
            Ok(None) => {
                self.finished = true;
                NextResult::Finished
            }
            Err(_elapsed) => NextResult::TimedOut,
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stops reading results without waiting for `done`.
    pub async fn abort(mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Err(err) = self.writer.shutdown().await {
            debug!("Closing connection to {} failed: {}", self.addr, err);
        }
    }

    /// Closes the write side and waits for the reader task.
    pub async fn close(mut self) {
        if let Err(err) = self.writer.shutdown().await {
            debug!("Closing connection to {} failed: {}", self.addr, err);
        }
        if let Some(task) = self.reader_task.take()
            && let Err(err) = task.await
        {
            warn!("Result reader for {} failed: {}", self.addr, err);
        }
    }

    async fn send_command(&mut self, command: &Command) -> AppResult<()> {
        write_line(&mut self.writer, &command.to_line()).await?;
        self.wait_for_ack(command.name()).await
    }

    async fn wait_for_ack(&mut self, command: &'static str) -> AppResult<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| AppError::distributed(DistributedError::ConnectionClosed))?;
        while let Some(line) = read_valid_line(reader).await? {
            match Reply::parse(&line) {
                Ok(Reply::Ok) => return Ok(()),
                Ok(Reply::Error(message)) => {
                    error!("Load generator {} reported: {}", self.addr, message);
                }
                Ok(other) => debug!("Ignoring {:?} from {} while waiting for ok", other, self.addr),
                Err(err) => warn!("Ignoring line from {}: {}", self.addr, err),
            }
        }
        Err(AppError::distributed(DistributedError::MissingAck {
            addr: self.addr.clone(),
            command,
        }))
    }
}

async fn read_results(
    mut reader: BufReader<OwnedReadHalf>,
    events: mpsc::UnboundedSender<GeneratorEvent>,
    addr: String,
) {
    loop {
        let line = match read_valid_line(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!("Load generator {} closed the connection before done", addr);
                return;
            }
            Err(err) => {
                error!("Lost connection to load generator {}: {}", addr, err);
                return;
            }
        };
        match Reply::parse(&line) {
            Ok(Reply::Interval(result)) => {
                if events.send(GeneratorEvent::Interval(result)).is_err() {
                    return;
                }
            }
            Ok(Reply::Done) => {
                debug!("Load generator {} is done", addr);
                return;
            }
            Ok(Reply::Error(message)) => {
                error!("Load generator {} aborted the run: {}", addr, message);
                if events.send(GeneratorEvent::Failed(message)).is_err() {
                    return;
                }
            }
            Ok(Reply::Ok | Reply::StartTimestamp(_)) => {
                debug!("Ignoring unexpected line '{}' from {}", line, addr);
            }
            Err(err) => warn!("Ignoring line from {}: {}", addr, err),
        }
    }
}
