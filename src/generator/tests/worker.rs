use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::generator::{
    CallScript, PoolMode, RequestSourcePool, ResultTracker, TransactionPool, Transport,
    WorkerContext, WorkerPool,
};

use super::{FixedStatusTransport, run_async_test};

struct Harness {
    transport: Arc<FixedStatusTransport>,
    tracker: Arc<ResultTracker>,
    transactions: Arc<TransactionPool>,
    workers: WorkerPool,
}

fn harness(transport: FixedStatusTransport, timeout: Option<Duration>) -> Result<Harness, String> {
    let script = CallScript::parse(["http://a.local/1", "http://a.local/2"])?;
    let transport = Arc::new(transport);
    let tracker = Arc::new(ResultTracker::new());
    let transactions = Arc::new(TransactionPool::with_capacity(4));
    let context = Arc::new(WorkerContext {
        sources: RequestSourcePool::new(script.sources(2), PoolMode::Queue, 5),
        transport: Arc::clone(&transport) as Arc<dyn Transport>,
        tracker: Arc::clone(&tracker),
        transactions: Arc::clone(&transactions),
        timeout,
    });
    Ok(Harness {
        transport,
        tracker,
        transactions,
        workers: WorkerPool::spawn(2, context),
    })
}

#[test]
fn successful_transactions_are_counted_and_recycled() -> Result<(), String> {
    run_async_test(async {
        let harness = harness(FixedStatusTransport::new(200), None)?;
        for _ in 0..6 {
            let transaction = harness.transactions.acquire(Instant::now());
            harness.workers.submit(transaction)?;
        }
        harness.workers.shutdown().await?;

        let totals = harness.tracker.totals();
        if totals.successful != 6 || totals.failed != 0 || totals.dropped != 0 {
            return Err(format!("Unexpected totals: {:?}", totals));
        }
        if harness.transactions.idle_count() != 6 {
            return Err(format!(
                "Expected transactions back in the pool, idle {}",
                harness.transactions.idle_count()
            ));
        }
        Ok(())
    })
}

#[test]
fn error_status_counts_as_failed() -> Result<(), String> {
    run_async_test(async {
        let harness = harness(FixedStatusTransport::new(503), None)?;
        harness
            .workers
            .submit(harness.transactions.acquire(Instant::now()))?;
        harness.workers.shutdown().await?;
        if harness.tracker.totals().failed != 1 {
            return Err(format!("Unexpected totals: {:?}", harness.tracker.totals()));
        }
        Ok(())
    })
}

#[test]
fn long_queueing_drops_without_sending() -> Result<(), String> {
    run_async_test(async {
        let harness = harness(
            FixedStatusTransport::new(200),
            Some(Duration::from_millis(20)),
        )?;
        let stale = Instant::now()
            .checked_sub(Duration::from_millis(200))
            .ok_or("Clock too close to its origin")?;
        harness.workers.submit(harness.transactions.acquire(stale))?;
        harness.workers.shutdown().await?;

        if harness.tracker.totals().dropped != 1 {
            return Err(format!("Unexpected totals: {:?}", harness.tracker.totals()));
        }
        if harness.transport.sent() != 0 {
            return Err("Dropped transaction must not reach the transport".to_owned());
        }
        Ok(())
    })
}

#[test]
fn slow_responses_fail_after_timeout() -> Result<(), String> {
    run_async_test(async {
        let harness = harness(
            FixedStatusTransport::delayed(200, Duration::from_millis(200)),
            Some(Duration::from_millis(20)),
        )?;
        harness
            .workers
            .submit(harness.transactions.acquire(Instant::now()))?;
        harness.workers.shutdown().await?;
        if harness.tracker.totals().failed != 1 {
            return Err(format!("Unexpected totals: {:?}", harness.tracker.totals()));
        }
        Ok(())
    })
}

#[test]
fn active_count_covers_queued_work() -> Result<(), String> {
    run_async_test(async {
        let harness = harness(
            FixedStatusTransport::delayed(200, Duration::from_millis(50)),
            None,
        )?;
        for _ in 0..5 {
            harness
                .workers
                .submit(harness.transactions.acquire(Instant::now()))?;
        }
        if harness.workers.active_count() != 5 {
            return Err(format!("Expected 5 active, got {}", harness.workers.active_count()));
        }
        let workers = harness.workers;
        while workers.active_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        workers.shutdown().await?;
        if harness.tracker.totals().successful != 5 {
            return Err(format!("Unexpected totals: {:?}", harness.tracker.totals()));
        }
        Ok(())
    })
}
