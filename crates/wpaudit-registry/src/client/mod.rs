//! HTTP client implementation with bounded retry on transient failures

use std::time::Duration;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, error, warn};

use wpaudit_core::error::AuditError;
use crate::RegistryResult;

/// Default plugin information endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.wordpress.org/plugins/info/1.2/";

/// Configuration for exponential backoff retry logic
///
/// Only connection failures and timeouts are retried. Once `max_retries`
/// retries have been spent the request fails with
/// [`AuditError::RetriesExhausted`] instead of looping forever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to use after `current`, capped at `max_delay`
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next = Duration::from_millis((current.as_millis() as f64 * self.multiplier) as u64);
        std::cmp::min(next, self.max_delay)
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// HTTP client for registry listing and archive downloads
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Plugin information endpoint
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the public registry with default settings
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(
            DEFAULT_BASE_URL,
            RetryConfig::default(),
            Duration::from_secs(30),
            concat!("wpaudit/", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a client with custom endpoint, retry policy and request timeout
    pub fn with_config(
        base_url: impl Into<String>,
        retry_config: RetryConfig,
        timeout: Duration,
        user_agent: &str,
    ) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AuditError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config,
            base_url: base_url.into(),
        })
    }

    /// Plugin information endpoint this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Active retry policy
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// GET `url` and read the whole body, retrying connection failures and
    /// timeouts with backoff.
    ///
    /// Sending the request and reading the body form one attempt, so a body
    /// that stalls past the client timeout is retried like a failed connect.
    /// Any response, whatever its status, is handed back to the caller.
    pub async fn fetch(&self, url: &str) -> RegistryResult<Fetched> {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match self.attempt(url).await {
                Ok(fetched) => {
                    debug!(url, status = fetched.status.as_u16(), bytes = fetched.body.len(), attempt, "fetched");
                    return Ok(fetched);
                }
                Err(e) => e,
            };

            if !is_transient(&err) {
                return Err(AuditError::network(format!("Request to '{}' failed: {}", url, err), err));
            }

            if attempt > self.retry_config.max_retries {
                error!(url, attempts = attempt, "giving up after repeated network failures");
                return Err(AuditError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Some(Box::new(err)),
                });
            }

            let reason = if err.is_timeout() { "Request timeout" } else { "Connection error" };
            warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "{} for '{}', retrying",
                reason,
                url
            );

            tokio::time::sleep(delay).await;
            delay = self.retry_config.next_delay(delay);
        }
    }

    async fn attempt(&self, url: &str) -> Result<Fetched, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(Fetched {
            status,
            body: body.to_vec(),
        })
    }

    /// Build the listing URL for one page
    pub fn query_plugins_url(&self, page: u32, per_page: u32, browse: Option<&str>) -> String {
        let mut url = format!(
            "{}?action=query_plugins&request[page]={}&request[per_page]={}",
            self.base_url, page, per_page
        );
        if let Some(browse) = browse {
            url.push_str("&request[browse]=");
            url.push_str(browse);
        }
        url
    }

    /// Download an archive, treating any non-2xx status as a failure
    pub async fn download_archive(&self, url: &str) -> RegistryResult<Vec<u8>> {
        let fetched = self.fetch(url).await?;

        if !fetched.status.is_success() {
            return Err(AuditError::HttpStatus {
                url: url.to_string(),
                status: fetched.status.as_u16(),
            });
        }

        Ok(fetched.body)
    }
}

/// Errors worth retrying: timeouts (a stalled body included) and failed connects
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests;
