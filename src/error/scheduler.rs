use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduled {scheduled} arrivals for a target of {target}.")]
    Overscheduled { scheduled: u64, target: u64 },
    #[error("Arrival rate profile is empty.")]
    EmptyProfile,
    #[error("Worker pool is closed.")]
    PoolClosed,
    #[error("Request source pool is closed.")]
    SourcePoolClosed,
}
