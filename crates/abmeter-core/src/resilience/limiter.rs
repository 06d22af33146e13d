use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AbmeterError;

// ---------------------------------------------------------------------------
// LimiterConfig
// ---------------------------------------------------------------------------

/// Client-side admission control limits: how many requests may execute
/// concurrently, and how many more may wait for a permit before further
/// callers are rejected outright.
#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    pub permit_limit: usize,
    pub queue_limit: usize,
}

// ---------------------------------------------------------------------------
// ConcurrencyLimiter
// ---------------------------------------------------------------------------

/// A permit/queue concurrency limiter.
///
/// At most `permit_limit` callers hold a permit at once; up to `queue_limit`
/// more may be parked waiting. A caller arriving when both the permit pool
/// and the queue are full gets an immediate [`AbmeterError::QueueFull`]
/// instead of waiting.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    /// Callers currently holding a permit or waiting for one.
    registered: Arc<AtomicUsize>,
    config: LimiterConfig,
}

/// An acquired slot. Dropping it releases both the semaphore permit and the
/// registration slot.
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    registered: Arc<AtomicUsize>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        self.registered.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConcurrencyLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.permit_limit)),
            registered: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Acquire a concurrency slot, waiting in the queue if necessary.
    pub async fn acquire(&self) -> Result<LimiterPermit, AbmeterError> {
        let prev = self.registered.fetch_add(1, Ordering::AcqRel);
        if prev >= self.config.permit_limit + self.config.queue_limit {
            self.registered.fetch_sub(1, Ordering::AcqRel);
            return Err(AbmeterError::QueueFull {
                limit: self.config.queue_limit,
            });
        }

        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => Ok(LimiterPermit {
                _permit: permit,
                registered: Arc::clone(&self.registered),
            }),
            Err(_) => {
                self.registered.fetch_sub(1, Ordering::AcqRel);
                Err(AbmeterError::Internal(
                    "limiter semaphore closed".to_string(),
                ))
            }
        }
    }

    /// Number of callers currently holding or waiting for a permit.
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
