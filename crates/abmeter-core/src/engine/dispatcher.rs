use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::recorder::{OutcomeRecorder, OutcomeSnapshot};
use crate::error::AbmeterError;

// ---------------------------------------------------------------------------
// DispatchResult
// ---------------------------------------------------------------------------

/// Outcome of a fully drained dispatch: the recorder's tallies plus the
/// wall-clock duration of the whole batch.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub snapshot: OutcomeSnapshot,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// run_dispatch
// ---------------------------------------------------------------------------

/// Issue `total_requests` calls to `request_fn` with at most `parallelism`
/// in flight at once, recording every outcome.
///
/// A fixed pool of worker tasks claims 0-based request indices from a shared
/// counter until the batch is exhausted, so each index is dispatched exactly
/// once and no more than `parallelism` requests are ever active. Each call
/// is timed from dispatch to completion (retries included) and fed to the
/// recorder as either a response or an exception; a failing request never
/// aborts the batch. The function returns only once every worker has
/// drained.
pub async fn run_dispatch<F, Fut>(
    total_requests: usize,
    parallelism: usize,
    request_fn: F,
) -> Result<DispatchResult, AbmeterError>
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<u16, AbmeterError>> + Send + 'static,
{
    if parallelism == 0 {
        return Err(AbmeterError::Validation(
            "parallelism must be positive".to_string(),
        ));
    }

    let recorder = Arc::new(OutcomeRecorder::with_capacity(total_requests));
    let request_fn = Arc::new(request_fn);
    let next_index = Arc::new(AtomicUsize::new(0));
    let workers = parallelism.min(total_requests);

    let started = Instant::now();
    let mut pool: JoinSet<()> = JoinSet::new();

    for _ in 0..workers {
        let recorder = Arc::clone(&recorder);
        let request_fn = Arc::clone(&request_fn);
        let next_index = Arc::clone(&next_index);

        pool.spawn(async move {
            loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                if index >= total_requests {
                    break;
                }

                let attempt_started = Instant::now();
                let outcome = request_fn(index).await;
                let latency_ms = attempt_started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(status) => recorder.record_response(status, latency_ms),
                    Err(err) => recorder.record_exception(&err, latency_ms),
                }
            }
        });
    }

    // The batch is complete only when every worker has exited.
    while pool.join_next().await.is_some() {}
    let elapsed = started.elapsed();

    debug!(
        total_requests,
        workers,
        elapsed_ms = elapsed.as_millis() as u64,
        "dispatch drained"
    );

    Ok(DispatchResult {
        snapshot: recorder.snapshot(),
        elapsed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stats::LatencyStats;
    use parking_lot::Mutex;
    use tokio::time::sleep;

    #[tokio::test]
    async fn all_success_scenario_fills_the_success_bucket() {
        let result = run_dispatch(100, 10, |_| async {
            sleep(Duration::from_millis(5)).await;
            Ok(200)
        })
        .await
        .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.success_2xx, 100);
        assert_eq!(snap.exceptions, 0);
        assert_eq!(snap.completed(), 100);
        assert_eq!(snap.samples.len(), 100);

        let stats = LatencyStats::from_snapshot(snap);
        assert!(stats.avg_ms >= 5.0);
        assert!(stats.p50_ms <= stats.p95_ms);
        assert!(stats.p95_ms <= stats.p99_ms);
        assert!(stats.p99_ms <= stats.max_ms);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_parallelism() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let result = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            run_dispatch(100, 10, move |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(200)
                }
            })
            .await
            .expect("dispatch should succeed")
        };

        assert_eq!(result.snapshot.completed(), 100);
        assert!(peak.load(Ordering::SeqCst) <= 10);
    }

    #[tokio::test]
    async fn mixed_rate_limited_scenario() {
        // 3 of 10 requests hit the rate limit, the rest succeed.
        let result = run_dispatch(10, 5, |index| async move {
            if index < 3 {
                Ok(429)
            } else {
                Ok(200)
            }
        })
        .await
        .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.rate_limited_429, 3);
        assert_eq!(snap.success_2xx, 7);
        assert_eq!(snap.completed(), 10);
    }

    #[tokio::test]
    async fn all_exception_scenario_still_records_latencies() {
        let result = run_dispatch(5, 5, |_| async {
            Err(AbmeterError::Internal("connection refused".to_string()))
        })
        .await
        .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.exceptions, 5);
        assert_eq!(snap.success_2xx, 0);
        assert_eq!(snap.latency_count, 5);
        assert_eq!(snap.samples.len(), 5);
    }

    #[tokio::test]
    async fn failing_requests_do_not_abort_the_batch() {
        let result = run_dispatch(20, 4, |index| async move {
            if index % 2 == 0 {
                Err(AbmeterError::TotalTimeout)
            } else {
                Ok(200)
            }
        })
        .await
        .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.exceptions, 10);
        assert_eq!(snap.success_2xx, 10);
        assert_eq!(snap.completed(), 20);
    }

    #[tokio::test]
    async fn empty_run_produces_empty_snapshot() {
        let result = run_dispatch(0, 10, |_| async { Ok(200) })
            .await
            .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.completed(), 0);
        assert!(snap.samples.is_empty());
    }

    #[tokio::test]
    async fn zero_parallelism_is_rejected() {
        let result = run_dispatch(10, 0, |_| async { Ok(200) }).await;
        assert!(matches!(result, Err(AbmeterError::Validation(_))));
    }

    #[tokio::test]
    async fn every_index_is_dispatched_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let result = {
            let seen = Arc::clone(&seen);
            run_dispatch(50, 7, move |index| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push(index);
                    Ok(200)
                }
            })
            .await
            .expect("dispatch should succeed")
        };

        assert_eq!(result.snapshot.completed(), 50);
        let mut indices = seen.lock().clone();
        indices.sort_unstable();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn parallelism_larger_than_total_is_allowed() {
        let result = run_dispatch(3, 100, |_| async { Ok(202) })
            .await
            .expect("dispatch should succeed");

        let snap = &result.snapshot;
        assert_eq!(snap.success_2xx, 3);
        assert_eq!(snap.accepted_202, 3);
    }
}
