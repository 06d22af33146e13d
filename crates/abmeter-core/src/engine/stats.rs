use crate::engine::recorder::OutcomeSnapshot;

// ---------------------------------------------------------------------------
// Percentile statistics
// ---------------------------------------------------------------------------

/// Nearest-rank percentile of `samples` for `p` in `[0.0, 1.0]`.
///
/// Sorts a defensive copy and selects index `ceil(p * n) - 1` clamped to the
/// valid range; no interpolation. Returns 0 for an empty sample set.
pub fn percentile(samples: &[u64], p: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let idx = (p * sorted.len() as f64).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

/// Mean latency from the running sum and count; 0 with no samples.
pub fn average_ms(sum_ms: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum_ms as f64 / count as f64
}

/// Aggregate throughput over the whole run; 0 for a non-positive duration.
pub fn throughput_rps(total_requests: u64, elapsed_ms: u64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    total_requests as f64 / (elapsed_ms as f64 / 1000.0)
}

// ---------------------------------------------------------------------------
// LatencyStats
// ---------------------------------------------------------------------------

/// Summary latency statistics computed from a finished run's sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

impl LatencyStats {
    pub fn from_snapshot(snapshot: &OutcomeSnapshot) -> Self {
        Self {
            avg_ms: average_ms(snapshot.latency_sum_ms, snapshot.latency_count),
            p50_ms: percentile(&snapshot.samples, 0.50),
            p95_ms: percentile(&snapshot.samples, 0.95),
            p99_ms: percentile(&snapshot.samples, 0.99),
            max_ms: snapshot.max_latency_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recorder::OutcomeRecorder;

    #[test]
    fn percentile_empty_returns_zero() {
        assert_eq!(percentile(&[], 0.0), 0);
        assert_eq!(percentile(&[], 0.5), 0);
        assert_eq!(percentile(&[], 1.0), 0);
    }

    #[test]
    fn percentile_single_entry_returns_that_value() {
        assert_eq!(percentile(&[250], 0.5), 250);
        assert_eq!(percentile(&[250], 0.99), 250);
    }

    #[test]
    fn percentile_uses_nearest_rank_selection() {
        let samples = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        // p50 of 10 values: index ceil(0.5 * 10) - 1 = 4, value 50.
        assert_eq!(percentile(&samples, 0.50), 50);
        // p90: index ceil(0.9 * 10) - 1 = 8, value 90.
        assert_eq!(percentile(&samples, 0.90), 90);
        // p100: index 9, value 100.
        assert_eq!(percentile(&samples, 1.0), 100);
    }

    #[test]
    fn percentile_is_not_affected_by_insertion_order() {
        let ordered = [10u64, 50, 100, 200, 500];
        let reversed = [500u64, 200, 100, 50, 10];
        assert_eq!(percentile(&ordered, 0.5), percentile(&reversed, 0.5));
        assert_eq!(percentile(&ordered, 0.95), percentile(&reversed, 0.95));
    }

    #[test]
    fn percentiles_are_monotonic_in_p() {
        let samples = [12u64, 7, 90, 33, 41, 5, 77, 63, 18, 29, 55, 81];
        let p50 = percentile(&samples, 0.50);
        let p95 = percentile(&samples, 0.95);
        let p99 = percentile(&samples, 0.99);
        let max = *samples.iter().max().expect("non-empty");
        assert!(p50 <= p95);
        assert!(p95 <= p99);
        assert!(p99 <= max);
    }

    #[test]
    fn percentile_does_not_mutate_input_order() {
        let samples = vec![30u64, 10, 20];
        let _ = percentile(&samples, 0.5);
        assert_eq!(samples, vec![30, 10, 20]);
    }

    #[test]
    fn average_of_no_samples_is_zero() {
        assert_eq!(average_ms(0, 0), 0.0);
    }

    #[test]
    fn average_divides_sum_by_count() {
        assert!((average_ms(350, 3) - 116.666).abs() < 0.001);
    }

    #[test]
    fn throughput_zero_elapsed_is_zero() {
        assert_eq!(throughput_rps(100, 0), 0.0);
    }

    #[test]
    fn throughput_scales_with_elapsed_time() {
        assert!((throughput_rps(100, 2000) - 50.0).abs() < 0.001);
        assert!((throughput_rps(1, 500) - 2.0).abs() < 0.001);
    }

    #[test]
    fn latency_stats_from_recorder_snapshot() {
        let recorder = OutcomeRecorder::with_capacity(4);
        recorder.record_response(200, 100);
        recorder.record_response(200, 200);
        recorder.record_response(200, 300);
        recorder.record_response(200, 400);

        let stats = LatencyStats::from_snapshot(&recorder.snapshot());
        assert!((stats.avg_ms - 250.0).abs() < 0.001);
        assert_eq!(stats.p50_ms, 200);
        assert_eq!(stats.p95_ms, 400);
        assert_eq!(stats.p99_ms, 400);
        assert_eq!(stats.max_ms, 400);
    }

    #[test]
    fn latency_stats_on_empty_snapshot_are_zero() {
        let stats = LatencyStats::from_snapshot(&OutcomeRecorder::with_capacity(0).snapshot());
        assert_eq!(stats.avg_ms, 0.0);
        assert_eq!(stats.p50_ms, 0);
        assert_eq!(stats.p95_ms, 0);
        assert_eq!(stats.p99_ms, 0);
        assert_eq!(stats.max_ms, 0);
    }
}
