//! Comparative HTTP load-test harness.
//!
//! Runs the same fixed batch of POST requests through two differently
//! configured clients (a plain baseline and a throttled/retrying/breaker
//! variant), bounded to a configured parallelism, and reports status-code
//! buckets, latency percentiles, and throughput for each run.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod resilience;
pub mod results;
pub mod runner;

pub use config::{ClientProfile, HarnessConfig};
pub use error::AbmeterError;
pub use results::RunSummary;
pub use runner::{run_comparison, ComparisonOutcome};
