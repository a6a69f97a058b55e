//! Load generator node: paces arrivals from a profile and executes requests.
//!
//! The [`server`] accepts a director, collects configuration over the control
//! protocol and hands the run to the [`Scheduler`], which feeds a fixed
//! [`WorkerPool`]. Workers lease a [`RequestSource`], issue the request over a
//! [`Transport`] and log the outcome in the shared [`ResultTracker`].
mod calls;
mod scheduler;
mod server;
mod source;
mod tracker;
mod transaction;
mod transport;
mod worker;

#[cfg(test)]
mod tests;

pub use calls::{CallListSource, CallScript};
pub use scheduler::{
    MAX_DEFAULT_MEAN_WAIT_MS, Scheduler, batch_size, default_mean_wait_ms,
    effective_mean_wait_ms, post_batch_sleep_ms,
};
pub use server::{DEFAULT_THREAD_COUNT, run_load_generator, serve};
pub use source::{
    FALLBACK_POOL_SEED, HttpMethod, PoolMode, RequestDescription, RequestSource,
    RequestSourcePool, SourceLease,
};
pub use tracker::{IntervalSnapshot, ResultTracker, TrackerTotals};
pub use transaction::{INITIAL_POOL_SIZE, Outcome, Transaction, TransactionPool};
pub use transport::{ReqwestTransport, ReqwestTransportFactory, Transport, TransportFactory};
pub use worker::{WorkerContext, WorkerPool};
