use std::time::Duration;

use crate::error::AbmeterError;
use crate::resilience::{CircuitBreakerConfig, LimiterConfig, RetryPolicy};

// ---------------------------------------------------------------------------
// ClientProfile
// ---------------------------------------------------------------------------

/// Resilience configuration for one side of the comparison.
///
/// The two stock profiles deliberately preserve their historical parameters
/// rather than being normalised into an apples-to-apples pair; the point of
/// the harness is to observe exactly these two configurations side by side.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    /// Report label ("OLD"/"NEW").
    pub label: String,
    /// Per-attempt timeout enforced by the HTTP client.
    pub attempt_timeout: Duration,
    /// Overall deadline spanning all retries of one logical request.
    pub total_timeout: Option<Duration>,
    pub retry: RetryPolicy,
    /// Client-side permit/queue admission control.
    pub limiter: Option<LimiterConfig>,
    pub breaker: Option<CircuitBreakerConfig>,
    /// Whether 429 responses are retried (they never count as breaker
    /// failures either way).
    pub retry_on_rate_limit: bool,
}

impl ClientProfile {
    /// Baseline profile: fixed-delay retries, no throttling, no breaker.
    pub fn baseline() -> Self {
        Self {
            label: "OLD".to_string(),
            attempt_timeout: Duration::from_secs(10),
            total_timeout: None,
            retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
            limiter: None,
            breaker: None,
            retry_on_rate_limit: false,
        }
    }

    /// Resilient profile: throttled, jittered exponential retries that also
    /// cover 429, and a failure-ratio circuit breaker.
    pub fn resilient() -> Self {
        Self {
            label: "NEW".to_string(),
            attempt_timeout: Duration::from_secs(15),
            total_timeout: Some(Duration::from_secs(120)),
            retry: RetryPolicy::exponential_jittered(3, Duration::from_secs(3)),
            limiter: Some(LimiterConfig {
                permit_limit: 5,
                queue_limit: 150,
            }),
            breaker: Some(CircuitBreakerConfig {
                failure_ratio: 0.7,
                minimum_throughput: 20,
                sampling_window: Duration::from_secs(30),
                break_duration: Duration::from_secs(15),
            }),
            retry_on_rate_limit: true,
        }
    }
}

// ---------------------------------------------------------------------------
// HarnessConfig
// ---------------------------------------------------------------------------

/// Full configuration for one comparative run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Target origin, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path of the POST endpoint.
    pub endpoint_path: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Fixed `event` field of the form body.
    pub event_name: String,
    /// Prefix of the per-request `id` field; the request index is appended.
    pub id_prefix: String,
    pub total_requests: usize,
    pub parallelism: usize,
    /// Pause between the two runs so server-side throttling state settles.
    pub cooldown: Duration,
    pub baseline: ClientProfile,
    pub resilient: ClientProfile,
}

impl HarnessConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint_path: "/v1/track-event".to_string(),
            api_key: api_key.into(),
            event_name: "LoadTest Event".to_string(),
            id_prefix: "test-user".to_string(),
            total_requests: 2000,
            parallelism: 50,
            cooldown: Duration::from_secs(3),
            baseline: ClientProfile::baseline(),
            resilient: ClientProfile::resilient(),
        }
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), AbmeterError> {
        if self.base_url.trim().is_empty() {
            return Err(AbmeterError::Validation(
                "base_url must not be empty".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(AbmeterError::Validation(
                "api_key must not be empty".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(AbmeterError::Validation(
                "parallelism must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the target endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_path.trim_start_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_profile_has_no_limiter_or_breaker() {
        let profile = ClientProfile::baseline();
        assert!(profile.limiter.is_none());
        assert!(profile.breaker.is_none());
        assert!(!profile.retry_on_rate_limit);
        assert_eq!(profile.retry.max_retries, 3);
        assert_eq!(profile.attempt_timeout, Duration::from_secs(10));
    }

    #[test]
    fn resilient_profile_carries_full_policy_set() {
        let profile = ClientProfile::resilient();
        let limiter = profile.limiter.expect("limiter configured");
        assert_eq!(limiter.permit_limit, 5);
        assert_eq!(limiter.queue_limit, 150);

        let breaker = profile.breaker.expect("breaker configured");
        assert!((breaker.failure_ratio - 0.7).abs() < f64::EPSILON);
        assert_eq!(breaker.minimum_throughput, 20);
        assert_eq!(breaker.sampling_window, Duration::from_secs(30));
        assert_eq!(breaker.break_duration, Duration::from_secs(15));

        assert!(profile.retry_on_rate_limit);
        assert_eq!(profile.total_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn new_config_has_expected_defaults() {
        let config = HarnessConfig::new("https://api.example.com", "key");
        assert_eq!(config.total_requests, 2000);
        assert_eq!(config.parallelism, 50);
        assert_eq!(config.cooldown, Duration::from_secs(3));
        assert_eq!(config.endpoint_path, "/v1/track-event");
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let config = HarnessConfig::new("", "key");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = HarnessConfig::new("https://api.example.com", "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let mut config = HarnessConfig::new("https://api.example.com", "key");
        config.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_zero_total_requests() {
        // An empty run is legal and produces an all-zero summary.
        let mut config = HarnessConfig::new("https://api.example.com", "key");
        config.total_requests = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_url_joins_without_duplicate_slash() {
        let mut config = HarnessConfig::new("https://api.example.com/", "key");
        config.endpoint_path = "/v1/track-event".to_string();
        assert_eq!(
            config.endpoint_url(),
            "https://api.example.com/v1/track-event"
        );
    }
}
