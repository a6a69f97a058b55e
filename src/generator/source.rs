use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Semaphore;

use crate::error::{AppError, AppResult, SchedulerError};

/// Seed used by the random checkout mode when the run seed is not positive.
pub const FALLBACK_POOL_SEED: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Matches the bracketed method tag of a call line, case-insensitively.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Everything a transport needs to issue one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescription {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
}

impl RequestDescription {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
        }
    }
}

/// Stateful producer of request descriptions.
///
/// A source walks a call cycle. After a failed or dropped request the worker
/// reverts the last call so the same call is issued again the next time this
/// source is used.
pub trait RequestSource: Send {
    fn next_request(&mut self) -> RequestDescription;
    fn revert_last_call(&mut self);
}

/// How workers pick a request source from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolMode {
    /// First in, first out.
    #[default]
    Queue,
    /// Uniformly random among the idle sources.
    Random,
}

impl PoolMode {
    #[must_use]
    pub const fn from_randomize_users(randomize_users: bool) -> Self {
        if randomize_users {
            Self::Random
        } else {
            Self::Queue
        }
    }
}

struct PoolState {
    idle: VecDeque<Box<dyn RequestSource>>,
    rng: StdRng,
}

struct PoolShared {
    mode: PoolMode,
    state: Mutex<PoolState>,
    available: Semaphore,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed set of request sources, each held by at most one worker at a time.
#[derive(Clone)]
pub struct RequestSourcePool {
    shared: Arc<PoolShared>,
}

impl std::fmt::Debug for RequestSourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSourcePool")
            .field("mode", &self.shared.mode)
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl RequestSourcePool {
    /// Builds a pool from prepared sources.
    ///
    /// `seed` drives the random checkout mode; values `<= 0` fall back to a
    /// fixed seed so runs stay reproducible.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn RequestSource>>, mode: PoolMode, seed: i64) -> Self {
        let seed = u64::try_from(seed)
            .ok()
            .filter(|seed| *seed > 0)
            .unwrap_or(FALLBACK_POOL_SEED);
        let permits = sources.len();
        Self {
            shared: Arc::new(PoolShared {
                mode,
                state: Mutex::new(PoolState {
                    idle: sources.into(),
                    rng: StdRng::seed_from_u64(seed),
                }),
                available: Semaphore::new(permits),
            }),
        }
    }

    /// Waits for an idle source and leases it out.
    ///
    /// Waiters are served in arrival order. The source goes back to the pool
    /// when the lease is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error when the pool's permits and idle sources disagree.
    pub async fn checkout(&self) -> AppResult<SourceLease> {
        let permit = self
            .shared
            .available
            .acquire()
            .await
            .map_err(|_err| AppError::scheduler(SchedulerError::SourcePoolClosed))?;
        permit.forget();

        let idle = {
            let mut state = self.shared.lock();
            match self.shared.mode {
                PoolMode::Queue => state.idle.pop_front(),
                PoolMode::Random => {
                    let len = state.idle.len();
                    if len == 0 {
                        None
                    } else {
                        let idx = state.rng.gen_range(0..len);
                        state.idle.swap_remove_back(idx)
                    }
                }
            }
        };

        let source =
            idle.ok_or_else(|| AppError::scheduler(SchedulerError::SourcePoolClosed))?;
        Ok(SourceLease {
            source,
            shared: Arc::clone(&self.shared),
        })
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.lock().idle.len()
    }
}

/// A request source on loan to one worker.
pub struct SourceLease {
    source: Box<dyn RequestSource>,
    shared: Arc<PoolShared>,
}

impl Deref for SourceLease {
    type Target = dyn RequestSource;

    fn deref(&self) -> &Self::Target {
        self.source.as_ref()
    }
}

impl DerefMut for SourceLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.source.as_mut()
    }
}

impl Drop for SourceLease {
    fn drop(&mut self) {
        let source = std::mem::replace(&mut self.source, Box::new(Returned));
        self.shared.lock().idle.push_back(source);
        self.shared.available.add_permits(1);
    }
}

// Placeholder left inside a lease while its source travels back to the pool.
struct Returned;

impl RequestSource for Returned {
    fn next_request(&mut self) -> RequestDescription {
        RequestDescription::get(String::new())
    }

    fn revert_last_call(&mut self) {}
}
