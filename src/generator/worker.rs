use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{AppError, AppResult, HttpError, SchedulerError};

use super::source::RequestSourcePool;
use super::tracker::ResultTracker;
use super::transaction::{Outcome, Transaction, TransactionPool};
use super::transport::Transport;

/// Collaborators every worker needs to run a transaction.
pub struct WorkerContext {
    pub sources: RequestSourcePool,
    pub transport: Arc<dyn Transport>,
    pub tracker: Arc<ResultTracker>,
    pub transactions: Arc<TransactionPool>,
    /// Upper bound for queueing and in-flight time; `None` waits forever.
    pub timeout: Option<Duration>,
}

/// Fixed number of long-lived worker tasks fed through an unbounded queue.
///
/// Submitting never blocks. Transactions that find every worker busy wait in
/// the queue, which shows up as queueing delay and eventually as drops.
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Transaction>,
    in_flight: Arc<AtomicUsize>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    #[must_use]
    pub fn spawn(size: usize, context: Arc<WorkerContext>) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel::<Transaction>();
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let handles = (0..size.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let in_flight = Arc::clone(&in_flight);
                let context = Arc::clone(&context);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(transaction) = next else {
                            break;
                        };
                        execute_transaction(transaction, &context).await;
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                    trace!("Worker {} stopped", worker_id);
                })
            })
            .collect();

        Self {
            queue,
            in_flight,
            handles,
        }
    }

    /// Queues a transaction for the next free worker.
    ///
    /// # Errors
    ///
    /// Returns an error when all workers have stopped.
    pub fn submit(&self, transaction: Transaction) -> AppResult<()> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.queue.send(transaction).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(AppError::scheduler(SchedulerError::PoolClosed));
        }
        Ok(())
    }

    /// Transactions that are queued or still executing.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stops accepting work and waits for the workers to finish what is queued.
    ///
    /// # Errors
    ///
    /// Returns an error when a worker task panicked.
    pub async fn shutdown(self) -> AppResult<()> {
        let Self { queue, handles, .. } = self;
        drop(queue);
        for handle in handles {
            handle.await?;
        }
        Ok(())
    }
}

async fn execute_transaction(transaction: Transaction, context: &WorkerContext) {
    let outcome = run_transaction(&transaction, context).await;
    match &outcome {
        Outcome::Success(latency) => trace!("Transaction succeeded in {:?}", latency),
        Outcome::Failed(reason) => debug!("Transaction failed: {}", reason),
        Outcome::Dropped(reason) => debug!("Transaction dropped: {}", reason),
    }
    context.tracker.log_outcome(&outcome);
    context.transactions.release(transaction);
}

async fn run_transaction(transaction: &Transaction, context: &WorkerContext) -> Outcome {
    let mut source = match context.sources.checkout().await {
        Ok(source) => source,
        Err(err) => return Outcome::Failed(err.to_string()),
    };
    let request = source.next_request();

    let started = Instant::now();
    if let Some(timeout) = context.timeout {
        let queued = transaction.queued_for(started);
        if queued > timeout {
            source.revert_last_call();
            return Outcome::Dropped(format!(
                "waited {} ms in queue, timeout is {} ms",
                queued.as_millis(),
                timeout.as_millis()
            ));
        }
    }

    let sent = match context.timeout {
        Some(timeout) => tokio::time::timeout(timeout, context.transport.send(&request))
            .await
            .unwrap_or(Err(HttpError::Timeout)),
        None => context.transport.send(&request).await,
    };

    let outcome = match sent {
        Ok(status) if status < 400 => Outcome::Success(started.elapsed()),
        Ok(status) => Outcome::Failed(format!(
            "{} {} returned status {}",
            request.method.as_str(),
            request.url,
            status
        )),
        Err(err) => Outcome::Failed(format!(
            "{} {}: {}",
            request.method.as_str(),
            request.url,
            err
        )),
    };
    if !outcome.is_success() {
        source.revert_last_call();
    }
    outcome
}
