use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::debug;

use crate::error::AbmeterError;

// ---------------------------------------------------------------------------
// OutcomeSnapshot
// ---------------------------------------------------------------------------

/// The recorder's final tallies, taken after every in-flight request has
/// completed.
#[derive(Debug, Clone)]
pub struct OutcomeSnapshot {
    pub success_2xx: u64,
    /// Subset of `success_2xx` with status exactly 202.
    pub accepted_202: u64,
    pub rate_limited_429: u64,
    pub other_non_2xx: u64,
    pub exceptions: u64,
    pub latency_sum_ms: u64,
    pub latency_count: u64,
    pub max_latency_ms: u64,
    /// Collected latency samples, one per completed request.
    pub samples: Vec<u64>,
}

impl OutcomeSnapshot {
    /// Number of completed requests: always the sum of the four top-level
    /// outcome buckets (the 202 sub-counter is not a bucket of its own).
    pub fn completed(&self) -> u64 {
        self.success_2xx + self.rate_limited_429 + self.other_non_2xx + self.exceptions
    }
}

// ---------------------------------------------------------------------------
// OutcomeRecorder
// ---------------------------------------------------------------------------

/// Lock-free per-request outcome tallies for one test run.
///
/// All counters are independent atomics; correctness never depends on
/// cross-field coordination. Latency samples land in a fixed-capacity slot
/// array where each writer claims a unique index with a single `fetch_add`,
/// so concurrent writers cannot overwrite each other. The running max uses
/// `fetch_max` and is exact once all writers have finished.
pub struct OutcomeRecorder {
    success_2xx: AtomicU64,
    accepted_202: AtomicU64,
    rate_limited_429: AtomicU64,
    other_non_2xx: AtomicU64,
    exceptions: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
    max_latency_ms: AtomicU64,
    samples: Box<[AtomicU64]>,
    next_slot: AtomicUsize,
}

impl OutcomeRecorder {
    /// Create a recorder sized for `capacity` latency samples (one per
    /// expected request).
    pub fn with_capacity(capacity: usize) -> Self {
        let samples = (0..capacity)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            success_2xx: AtomicU64::new(0),
            accepted_202: AtomicU64::new(0),
            rate_limited_429: AtomicU64::new(0),
            other_non_2xx: AtomicU64::new(0),
            exceptions: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            max_latency_ms: AtomicU64::new(0),
            samples,
            next_slot: AtomicUsize::new(0),
        }
    }

    /// Classify and tally one completed HTTP response.
    pub fn record_response(&self, status: u16, latency_ms: u64) {
        self.record_latency(latency_ms);

        if (200..=299).contains(&status) {
            self.success_2xx.fetch_add(1, Ordering::Relaxed);
            if status == 202 {
                self.accepted_202.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }

        if status == 429 {
            self.rate_limited_429.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.other_non_2xx.fetch_add(1, Ordering::Relaxed);
    }

    /// Tally one request that failed without producing a status code.
    ///
    /// The error itself is only logged; the taxonomy does not distinguish
    /// exception types.
    pub fn record_exception(&self, error: &AbmeterError, latency_ms: u64) {
        debug!(error = %error, "request ended in exception");
        self.record_latency(latency_ms);
        self.exceptions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency_ms: u64) {
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        // Claim a unique slot; the bound check only triggers if more
        // completions arrive than the recorder was sized for.
        let idx = self.next_slot.fetch_add(1, Ordering::Relaxed);
        if idx < self.samples.len() {
            self.samples[idx].store(latency_ms, Ordering::Relaxed);
        }
    }

    /// Take the final tallies. Only meaningful once all writers are done.
    pub fn snapshot(&self) -> OutcomeSnapshot {
        let written = self.next_slot.load(Ordering::Acquire).min(self.samples.len());
        let samples = self.samples[..written]
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .collect();

        OutcomeSnapshot {
            success_2xx: self.success_2xx.load(Ordering::Relaxed),
            accepted_202: self.accepted_202.load(Ordering::Relaxed),
            rate_limited_429: self.rate_limited_429.load(Ordering::Relaxed),
            other_non_2xx: self.other_non_2xx.load(Ordering::Relaxed),
            exceptions: self.exceptions.load(Ordering::Relaxed),
            latency_sum_ms: self.latency_sum_ms.load(Ordering::Relaxed),
            latency_count: self.latency_count.load(Ordering::Relaxed),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            samples,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
