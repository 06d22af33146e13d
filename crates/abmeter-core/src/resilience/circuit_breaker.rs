use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// CircuitState
// ---------------------------------------------------------------------------

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass through normally.
    Closed,
    /// Requests fail fast until the break duration elapses.
    Open,
    /// Probe requests are allowed to test recovery.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

// ---------------------------------------------------------------------------
// CircuitBreakerConfig
// ---------------------------------------------------------------------------

/// Failure-ratio circuit breaker configuration.
///
/// The circuit opens when the fraction of failed outcomes within the rolling
/// `sampling_window` reaches `failure_ratio`, provided at least
/// `minimum_throughput` outcomes were observed in that window.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_ratio: f64,
    pub minimum_throughput: u32,
    pub sampling_window: Duration,
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio: 0.7,
            minimum_throughput: 20,
            sampling_window: Duration::from_secs(30),
            break_duration: Duration::from_secs(15),
        }
    }
}

// ---------------------------------------------------------------------------
// CircuitBreaker
// ---------------------------------------------------------------------------

struct BreakerInner {
    state: CircuitState,
    /// Rolling window of (timestamp, success) outcomes.
    window: Vec<(Instant, bool)>,
    opened_at: Option<Instant>,
    rejected: u64,
}

/// Thread-safe failure-ratio circuit breaker.
///
/// Callers decide which outcomes count: rate-limit responses are simply never
/// reported to the breaker, so sustained throttling cannot trip it.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                window: Vec::new(),
                opened_at: None,
                rejected: 0,
            }),
        }
    }

    /// Whether requests should currently fail fast.
    ///
    /// Also performs the open → half-open transition once the break duration
    /// has elapsed, so probing resumes without an external timer.
    pub fn is_open(&self) -> bool {
        let mut inner = self.inner.lock();
        self.update_state(&mut inner);
        inner.state == CircuitState::Open
    }

    /// Current state (after applying any pending open → half-open transition).
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.update_state(&mut inner);
        inner.state
    }

    /// Record an outcome the breaker should treat as a success.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        self.update_state(&mut inner);

        inner.window.push((Instant::now(), true));
        self.clean_window(&mut inner);

        if inner.state == CircuitState::HalfOpen {
            debug!("circuit breaker probe succeeded, closing");
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            inner.window.clear();
        }
    }

    /// Record an outcome the breaker should treat as a failure.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        self.update_state(&mut inner);

        inner.window.push((Instant::now(), false));
        self.clean_window(&mut inner);

        match inner.state {
            CircuitState::Closed => {
                if self.should_open(&inner) {
                    warn!(
                        break_duration_ms = self.config.break_duration.as_millis() as u64,
                        "circuit breaker opened"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker probe failed, reopening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    /// Record a request rejected because the circuit was open.
    pub fn record_rejection(&self) {
        let mut inner = self.inner.lock();
        inner.rejected += 1;
    }

    /// Number of requests rejected while the circuit was open.
    pub fn rejected(&self) -> u64 {
        self.inner.lock().rejected
    }

    fn update_state(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.break_duration {
                    debug!("circuit breaker entering half-open state");
                    inner.state = CircuitState::HalfOpen;
                }
            }
        }
    }

    fn should_open(&self, inner: &BreakerInner) -> bool {
        let total = inner.window.len() as u32;
        if total < self.config.minimum_throughput {
            return false;
        }
        let failures = inner.window.iter().filter(|(_, ok)| !ok).count();
        failures as f64 / total as f64 >= self.config.failure_ratio
    }

    fn clean_window(&self, inner: &mut BreakerInner) {
        // A window wider than the monotonic clock's age has no cutoff yet.
        if let Some(cutoff) = Instant::now().checked_sub(self.config.sampling_window) {
            inner.window.retain(|(at, _)| *at > cutoff);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
