use std::sync::Arc;

use chrono::Utc;
use tokio::time::sleep;
use tracing::info;

use crate::config::{ClientProfile, HarnessConfig};
use crate::engine::run_dispatch;
use crate::error::AbmeterError;
use crate::http::ResilientClient;
use crate::results::RunSummary;

// ---------------------------------------------------------------------------
// ComparisonOutcome
// ---------------------------------------------------------------------------

/// Both summaries of a completed comparative run, in execution order.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub baseline: RunSummary,
    pub resilient: RunSummary,
}

// ---------------------------------------------------------------------------
// run_comparison
// ---------------------------------------------------------------------------

/// Run the baseline profile to completion, cool down, then run the resilient
/// profile against the same endpoint and payload shape.
///
/// The two runs never overlap: the cooldown lets any server-side throttling
/// state settle so the second run is not contaminated by the first. Each run
/// gets a freshly built client, so limiter and breaker state never leaks
/// across runs.
pub async fn run_comparison(config: &HarnessConfig) -> Result<ComparisonOutcome, AbmeterError> {
    config.validate()?;

    info!(
        label = %config.baseline.label,
        total_requests = config.total_requests,
        parallelism = config.parallelism,
        "starting first run"
    );
    let baseline = run_profile(config, &config.baseline).await?;

    info!(
        cooldown_ms = config.cooldown.as_millis() as u64,
        "cooling down between runs"
    );
    sleep(config.cooldown).await;

    info!(label = %config.resilient.label, "starting second run");
    let resilient = run_profile(config, &config.resilient).await?;

    Ok(ComparisonOutcome {
        baseline,
        resilient,
    })
}

/// One full run of a single client profile.
async fn run_profile(
    config: &HarnessConfig,
    profile: &ClientProfile,
) -> Result<RunSummary, AbmeterError> {
    let client = Arc::new(ResilientClient::from_profile(config, profile)?);
    let started_at = Utc::now();

    let result = run_dispatch(config.total_requests, config.parallelism, move |index| {
        let client = Arc::clone(&client);
        async move { client.execute(index).await }
    })
    .await?;

    Ok(RunSummary::from_dispatch(
        profile.label.clone(),
        config.total_requests as u64,
        config.parallelism as u64,
        started_at,
        &result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
