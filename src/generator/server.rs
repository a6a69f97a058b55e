use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, ConfigError, DistributedError, ProtocolError};
use crate::profile::{ArrivalRateTuple, parse_tuples};
use crate::protocol::{
    Command, IntervalResult, Reply, SCRIPT_TERMINATOR, StartParams, read_counted_lines,
    read_until_terminator, read_valid_line, write_line, write_lines,
};

use super::calls::CallScript;
use super::scheduler::Scheduler;
use super::source::{PoolMode, RequestSourcePool};
use super::tracker::ResultTracker;
use super::transaction::TransactionPool;
use super::transport::TransportFactory;
use super::worker::{WorkerContext, WorkerPool};

/// Worker count used until the director sends `threadnum`.
pub const DEFAULT_THREAD_COUNT: usize = 128;

/// Binds `listen` and serves directors one after another.
///
/// With `once` set the generator exits after the first director session.
///
/// # Errors
///
/// Returns an error when the address cannot be bound or accepting fails.
pub async fn run_load_generator(
    listen: &str,
    once: bool,
    transports: Arc<dyn TransportFactory>,
) -> AppResult<()> {
    let listener = TcpListener::bind(listen).await.map_err(|err| {
        AppError::distributed(DistributedError::Bind {
            addr: listen.to_owned(),
            source: err,
        })
    })?;
    let local_addr = listener.local_addr()?;
    info!("Load generator listening on {}", local_addr);
    serve(listener, once, transports).await
}

/// Accept loop over an already bound listener.
///
/// # Errors
///
/// Returns an error when accepting a connection fails.
pub async fn serve(
    listener: TcpListener,
    once: bool,
    transports: Arc<dyn TransportFactory>,
) -> AppResult<()> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(|err| {
            AppError::distributed(DistributedError::Io {
                context: "accept director",
                source: err,
            })
        })?;
        info!("Director connected from {}", peer);
        match handle_director(stream, transports.as_ref()).await {
            Ok(()) => info!("Director session with {} finished", peer),
            Err(err) => warn!("Director session with {} ended: {}", peer, err),
        }
        if once {
            return Ok(());
        }
        info!("Waiting for the next director");
    }
}

/// Configuration collected from a director before `start`.
#[derive(Debug)]
struct SessionConfig {
    profile: Option<Vec<ArrivalRateTuple>>,
    script: Option<CallScript>,
    threads: usize,
    timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: None,
            script: None,
            threads: DEFAULT_THREAD_COUNT,
            timeout_ms: 0,
        }
    }
}

async fn handle_director(
    stream: TcpStream,
    transports: &dyn TransportFactory,
) -> AppResult<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    handle_commands(&mut reader, &mut writer, transports).await
}

/// Command loop of one director session. Returns after the run or on EOF.
pub(super) async fn handle_commands<R, W>(
    reader: &mut R,
    writer: &mut W,
    transports: &dyn TransportFactory,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut config = SessionConfig::default();
    while let Some(line) = read_valid_line(reader).await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                reject_line(writer, &line, &err).await?;
                continue;
            }
        };

        match command {
            Command::Profile { count } => {
                info!("Receiving {} arrival rates", count);
                let lines = read_counted_lines(reader, count, "arrival rate profile").await?;
                let profile = parse_tuples(lines.iter().map(String::as_str), 0.0);
                info!("Received {} arrival rate tuples", profile.len());
                config.profile = Some(profile);
            }
            Command::ThreadCount(threads) => {
                config.threads = threads.max(1);
                info!("Worker threads: {}", config.threads);
            }
            Command::TimeoutMs(timeout_ms) => {
                config.timeout_ms = timeout_ms;
                info!("Request timeout: {} ms", timeout_ms);
            }
            Command::Script => {
                let lines = read_until_terminator(reader, SCRIPT_TERMINATOR, "request script")
                    .await?;
                match CallScript::parse(lines.iter().map(String::as_str)) {
                    Ok(script) => {
                        info!("Received request script with {} calls", script.len());
                        config.script = Some(script);
                    }
                    Err(err) => {
                        error!("Rejected request script: {}", err);
                        config.script = None;
                        write_line(writer, &Reply::Error(err.to_string()).to_line()).await?;
                    }
                }
            }
            Command::Results => {}
            Command::Start(params) => {
                return run(writer, config, params, transports).await;
            }
        }
        write_line(writer, &Reply::Ok.to_line()).await?;
    }
    Ok(())
}

// Configuration lines are acknowledged even when their argument is broken.
async fn reject_line<W>(writer: &mut W, line: &str, err: &ProtocolError) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    if Command::expects_ack(line) {
        error!("Invalid configuration command: {}", err);
        let rejection = Reply::Error(err.to_string()).to_line();
        let ack = Reply::Ok.to_line();
        write_lines(writer, [rejection.as_str(), ack.as_str()]).await
    } else if Command::is_start(line) {
        error!("Invalid start command: {}", err);
        write_line(writer, &Reply::Error(err.to_string()).to_line()).await
    } else {
        warn!("Ignoring director line: {}", err);
        Ok(())
    }
}

async fn run<W>(
    writer: &mut W,
    config: SessionConfig,
    params: StartParams,
    transports: &dyn TransportFactory,
) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let epoch_ms = chrono::Utc::now().timestamp_millis();
    write_line(writer, &Reply::StartTimestamp(epoch_ms).to_line()).await?;
    info!("Starting run @ {}", epoch_ms);

    let outcome = match prepare(config, params, transports) {
        Ok((scheduler, profile, results)) => {
            let forward = forward_results(writer, results);
            let (run_result, forward_result) = tokio::join!(scheduler.run(&profile), forward);
            if let Err(err) = forward_result {
                warn!("Lost connection while streaming results: {}", err);
                return Err(err);
            }
            run_result
        }
        Err(err) => Err(err),
    };

    if let Err(err) = &outcome {
        error!("Run aborted: {}", err);
        write_line(writer, &Reply::Error(err.to_string()).to_line()).await?;
    }
    write_line(writer, &Reply::Done.to_line()).await
}

type PreparedRun = (
    Scheduler,
    Vec<ArrivalRateTuple>,
    mpsc::UnboundedReceiver<IntervalResult>,
);

fn prepare(
    config: SessionConfig,
    params: StartParams,
    transports: &dyn TransportFactory,
) -> AppResult<PreparedRun> {
    let profile = config
        .profile
        .filter(|profile| !profile.is_empty())
        .ok_or_else(|| AppError::config(ConfigError::ProfileNotReceived))?;
    let script = config
        .script
        .ok_or_else(|| AppError::config(ConfigError::ScriptNotReceived))?;

    let timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms));
    let transport = transports.build(timeout)?;
    let sources = RequestSourcePool::new(
        script.sources(config.threads),
        PoolMode::from_randomize_users(params.randomize_users),
        params.seed,
    );
    let tracker = Arc::new(ResultTracker::new());
    let transactions = Arc::new(TransactionPool::new());
    let context = Arc::new(WorkerContext {
        sources,
        transport,
        tracker: Arc::clone(&tracker),
        transactions: Arc::clone(&transactions),
        timeout,
    });
    let workers = WorkerPool::spawn(config.threads, context);

    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(params, workers, transactions, tracker, results_tx);
    Ok((scheduler, profile, results_rx))
}

async fn forward_results<W>(
    writer: &mut W,
    mut results: mpsc::UnboundedReceiver<IntervalResult>,
) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(result) = results.recv().await {
        write_line(writer, &result.to_line()).await?;
    }
    Ok(())
}
