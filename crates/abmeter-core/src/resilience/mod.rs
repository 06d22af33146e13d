pub mod circuit_breaker;
pub mod limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use limiter::{ConcurrencyLimiter, LimiterConfig, LimiterPermit};
pub use retry::{BackoffStrategy, RetryPolicy};
