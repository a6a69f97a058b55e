use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Number of transactions allocated up front by [`TransactionPool::new`].
pub const INITIAL_POOL_SIZE: usize = 400;

/// Terminal state of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Response received with a non-error status after the given latency.
    Success(Duration),
    /// Request executed but errored.
    Failed(String),
    /// Abandoned before execution because it waited too long in the queue.
    Dropped(String),
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One request's trip through the worker pool.
#[derive(Debug)]
pub struct Transaction {
    enqueued_at: Instant,
}

impl Transaction {
    const fn new(enqueued_at: Instant) -> Self {
        Self { enqueued_at }
    }

    /// Time spent between scheduling and `now`.
    #[must_use]
    pub fn queued_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

/// Recycles transactions between the scheduler and the workers.
#[derive(Debug)]
pub struct TransactionPool {
    idle: Mutex<Vec<Transaction>>,
}

impl Default for TransactionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionPool {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_POOL_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let now = Instant::now();
        let idle = (0..capacity).map(|_| Transaction::new(now)).collect();
        Self {
            idle: Mutex::new(idle),
        }
    }

    /// Takes an idle transaction, allocating a fresh one when the pool is empty.
    pub fn acquire(&self, enqueued_at: Instant) -> Transaction {
        let recycled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        recycled.map_or_else(
            || Transaction::new(enqueued_at),
            |mut transaction| {
                transaction.enqueued_at = enqueued_at;
                transaction
            },
        )
    }

    pub fn release(&self, transaction: Transaction) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transaction);
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
