use std::time::Duration;

// ---------------------------------------------------------------------------
// BackoffStrategy
// ---------------------------------------------------------------------------

/// How the delay between retry attempts grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed,
    /// Delay multiplied by `base` after each attempt.
    Exponential { base: f64 },
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry configuration for a single client profile.
///
/// `max_retries` counts retries, not attempts: a value of 3 allows up to
/// four tries of the underlying request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::Fixed,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Fixed-delay policy: the same pause before every retry.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            backoff: BackoffStrategy::Fixed,
            jitter: false,
        }
    }

    /// Exponential backoff with multiplicative jitter, doubling each attempt.
    pub fn exponential_jittered(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::Exponential { base: 2.0 },
            jitter: true,
        }
    }

    /// Delay to sleep after the given completed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = match self.backoff {
            BackoffStrategy::Fixed => self.initial_delay,
            BackoffStrategy::Exponential { base } => {
                let multiplier = base.powi(attempt.saturating_sub(1) as i32);
                Duration::from_nanos((self.initial_delay.as_nanos() as f64 * multiplier) as u64)
            }
        };

        let delay = base_delay.min(self.max_delay);

        if self.jitter {
            add_jitter(delay)
        } else {
            delay
        }
    }
}

/// Multiplicative jitter in the 0.8–1.2 range, to decorrelate retry storms.
fn add_jitter(delay: Duration) -> Duration {
    use rand::Rng;
    let jitter_factor = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_nanos((delay.as_nanos() as f64 * jitter_factor) as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
