use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AbmeterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("rate limiter queue is full (queue limit {limit})")]
    QueueFull { limit: usize },

    #[error("total request timeout elapsed")]
    TotalTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Serialize for AbmeterError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
