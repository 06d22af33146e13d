use std::future::Future;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::{ClientProfile, HarnessConfig};
use crate::error::AbmeterError;
use crate::http::client::HttpClient;
use crate::resilience::{CircuitBreaker, ConcurrencyLimiter, RetryPolicy};

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Whether a status code represents a transient server-side failure that is
/// worth retrying and counts against the circuit breaker.
fn is_transient_status(status: u16) -> bool {
    (500..=599).contains(&status) || status == 408
}

// ---------------------------------------------------------------------------
// ResilientClient
// ---------------------------------------------------------------------------

/// An HTTP client wired with one [`ClientProfile`]'s resilience policies.
///
/// `execute` issues one logical request: circuit-breaker admission, then the
/// concurrency limiter, then the retry loop under the profile's overall
/// deadline. The returned status is whatever the final attempt produced; a
/// request that exhausts its retries on 429 still resolves to `Ok(429)` so
/// the recorder tallies it as a rate-limited response, not an exception.
pub struct ResilientClient {
    http: HttpClient,
    url: String,
    api_key: String,
    event_name: String,
    id_prefix: String,
    retry: RetryPolicy,
    retry_on_rate_limit: bool,
    total_timeout: Option<std::time::Duration>,
    limiter: Option<ConcurrencyLimiter>,
    breaker: Option<CircuitBreaker>,
}

impl ResilientClient {
    /// Build a client for the given profile against the configured endpoint.
    pub fn from_profile(
        config: &HarnessConfig,
        profile: &ClientProfile,
    ) -> Result<Self, AbmeterError> {
        let http = HttpClient::builder()
            .timeout(profile.attempt_timeout)
            .pool_max_idle_per_host(config.parallelism.max(1))
            .build()?;

        Ok(Self {
            http,
            url: config.endpoint_url(),
            api_key: config.api_key.clone(),
            event_name: config.event_name.clone(),
            id_prefix: config.id_prefix.clone(),
            retry: profile.retry.clone(),
            retry_on_rate_limit: profile.retry_on_rate_limit,
            total_timeout: profile.total_timeout,
            limiter: profile.limiter.map(ConcurrencyLimiter::new),
            breaker: profile.breaker.map(CircuitBreaker::new),
        })
    }

    /// Execute the logical request for the given 0-based request index.
    pub async fn execute(&self, index: usize) -> Result<u16, AbmeterError> {
        if let Some(breaker) = &self.breaker {
            if breaker.is_open() {
                breaker.record_rejection();
                return Err(AbmeterError::CircuitOpen);
            }
        }

        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };

        let id = format!("{}-{}", self.id_prefix, index);
        let attempts = run_attempts(
            &self.retry,
            self.retry_on_rate_limit,
            self.breaker.as_ref(),
            || self.http.post_event(&self.url, &self.api_key, &id, &self.event_name),
        );

        with_total_timeout(self.total_timeout, attempts).await
    }
}

/// Apply a profile's overall deadline to a whole attempt sequence, retries
/// included. A sequence that outlives the deadline resolves to
/// [`AbmeterError::TotalTimeout`].
async fn with_total_timeout<Fut>(
    deadline: Option<std::time::Duration>,
    attempts: Fut,
) -> Result<u16, AbmeterError>
where
    Fut: Future<Output = Result<u16, AbmeterError>>,
{
    match deadline {
        Some(deadline) => match timeout(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => Err(AbmeterError::TotalTimeout),
        },
        None => attempts.await,
    }
}

// ---------------------------------------------------------------------------
// Attempt loop
// ---------------------------------------------------------------------------

/// Drive `send` through the retry policy, reporting per-attempt outcomes to
/// the breaker. Rate-limit responses are never reported to the breaker, so
/// sustained throttling cannot trip it.
async fn run_attempts<F, Fut>(
    retry: &RetryPolicy,
    retry_on_rate_limit: bool,
    breaker: Option<&CircuitBreaker>,
    mut send: F,
) -> Result<u16, AbmeterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u16, AbmeterError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match send().await {
            Ok(status) if is_transient_status(status) => {
                if let Some(b) = breaker {
                    b.record_failure();
                }
                if attempt <= retry.max_retries {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(status, attempt, delay_ms = delay.as_millis() as u64, "transient status, retrying");
                    sleep(delay).await;
                    continue;
                }
                return Ok(status);
            }
            Ok(status) if status == HTTP_TOO_MANY_REQUESTS => {
                if retry_on_rate_limit && attempt <= retry.max_retries {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, retrying");
                    sleep(delay).await;
                    continue;
                }
                return Ok(status);
            }
            Ok(status) => {
                if let Some(b) = breaker {
                    b.record_success();
                }
                return Ok(status);
            }
            Err(err) => {
                if let Some(b) = breaker {
                    b.record_failure();
                }
                if attempt <= retry.max_retries {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "request failed, retrying");
                    sleep(delay).await;
                    continue;
                }
                return Err(err);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
