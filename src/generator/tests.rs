use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppResult, HttpError};

use super::{RequestDescription, Transport, TransportFactory};

mod pacing;
mod worker;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

/// Transport answering every request with a fixed status, without I/O.
#[derive(Debug)]
struct FixedStatusTransport {
    status: u16,
    delay: Duration,
    sent: AtomicU64,
}

impl FixedStatusTransport {
    fn new(status: u16) -> Self {
        Self::delayed(status, Duration::ZERO)
    }

    fn delayed(status: u16, delay: Duration) -> Self {
        Self {
            status,
            delay,
            sent: AtomicU64::new(0),
        }
    }

    fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FixedStatusTransport {
    async fn send(&self, _request: &RequestDescription) -> Result<u16, HttpError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.status)
    }
}

struct SharedTransportFactory(Arc<FixedStatusTransport>);

impl TransportFactory for SharedTransportFactory {
    fn build(&self, _timeout: Option<Duration>) -> AppResult<Arc<dyn Transport>> {
        Ok(Arc::clone(&self.0) as Arc<dyn Transport>)
    }
}
