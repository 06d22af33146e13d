use std::time::Duration;

use crate::error::AbmeterError;

/// Wrapper around a reqwest Client with builder-pattern configuration and
/// connection-pool settings.
pub struct HttpClient {
    inner: reqwest::Client,
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("abmeter/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-attempt timeout applied to every request this client sends.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn build(self) -> Result<HttpClient, AbmeterError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient { inner: client })
    }
}

impl HttpClient {
    /// Returns a builder for customising the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// POST one form-encoded event and return the response status code.
    ///
    /// The response body is drained to release the pooled connection but is
    /// otherwise ignored; only the status code and timing matter here.
    pub async fn post_event(
        &self,
        url: &str,
        api_key: &str,
        id: &str,
        event: &str,
    ) -> Result<u16, AbmeterError> {
        let response = self
            .inner
            .post(url)
            .bearer_auth(api_key)
            .form(&[("id", id), ("event", event)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let _ = response.bytes().await;
        Ok(status)
    }
}
