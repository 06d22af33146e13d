use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::stats::{throughput_rps, LatencyStats};
use crate::engine::DispatchResult;

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Aggregated summary of one completed test run, ready for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Client-configuration label ("OLD"/"NEW").
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_requests: u64,
    pub parallelism: u64,
    /// Wall-clock duration of the whole run.
    pub elapsed_ms: u64,
    pub success_2xx: u64,
    /// Subset of `success_2xx` with status exactly 202.
    pub accepted_202: u64,
    pub rate_limited_429: u64,
    pub other_non_2xx: u64,
    pub exceptions: u64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub max_latency_ms: u64,
    pub requests_per_second: f64,
}

impl RunSummary {
    /// Build a summary from a drained dispatch.
    pub fn from_dispatch(
        label: impl Into<String>,
        total_requests: u64,
        parallelism: u64,
        started_at: DateTime<Utc>,
        result: &DispatchResult,
    ) -> Self {
        let elapsed_ms = result.elapsed.as_millis() as u64;
        let stats = LatencyStats::from_snapshot(&result.snapshot);
        let snap = &result.snapshot;

        Self {
            run_id: Uuid::new_v4(),
            label: label.into(),
            started_at,
            finished_at: Utc::now(),
            total_requests,
            parallelism,
            elapsed_ms,
            success_2xx: snap.success_2xx,
            accepted_202: snap.accepted_202,
            rate_limited_429: snap.rate_limited_429,
            other_non_2xx: snap.other_non_2xx,
            exceptions: snap.exceptions,
            avg_latency_ms: stats.avg_ms,
            p50_latency_ms: stats.p50_ms,
            p95_latency_ms: stats.p95_ms,
            p99_latency_ms: stats.p99_ms,
            max_latency_ms: stats.max_ms,
            requests_per_second: throughput_rps(total_requests, elapsed_ms),
        }
    }

    /// Plain-text summary block, one per run. Two of these printed back to
    /// back are the harness's whole report; no automatic delta is computed.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "========== {} CLIENT SUMMARY ==========\n",
            self.label
        ));
        out.push_str(&format!("Total requests: {}\n", self.total_requests));
        out.push_str(&format!("Parallelism:    {}\n", self.parallelism));
        out.push_str(&format!("Duration:       {} ms\n", self.elapsed_ms));
        out.push_str(&format!("2xx:            {}\n", self.success_2xx));
        out.push_str(&format!("202:            {}\n", self.accepted_202));
        out.push_str(&format!("429:            {}\n", self.rate_limited_429));
        out.push_str(&format!("Other non-2xx:  {}\n", self.other_non_2xx));
        out.push_str(&format!("Exceptions:     {}\n", self.exceptions));
        out.push_str(&format!(
            "Latency (ms):   avg={:.1}  p50={:.1}  p95={:.1}  p99={:.1}  max={}\n",
            self.avg_latency_ms,
            self.p50_latency_ms as f64,
            self.p95_latency_ms as f64,
            self.p99_latency_ms as f64,
            self.max_latency_ms
        ));
        out.push_str(&format!(
            "Throughput:     {:.1} req/s\n",
            self.requests_per_second
        ));
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
