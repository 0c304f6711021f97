//! HTTP client for the OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use common::protocol::ProviderResponse;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use super::retry::{retry_async, RetryPolicy};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP client could not be constructed.
    #[error("failed to build provider HTTP client: {0}")]
    Client(String),

    /// Connection, TLS or timeout failure.
    #[error("request to provider failed: {0}")]
    Transport(String),

    /// Non-2xx response. The body is kept for diagnostics but not displayed.
    #[error("provider returned status {status}")]
    Status { status: u16, body: String },

    /// 2xx response whose body is not a chat-completions response.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Transport errors, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Client(_) | ProviderError::Decode(_) => false,
        }
    }
}

pub struct ProviderClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    referer: String,
    retry: RetryPolicy,
}

impl ProviderClient {
    /// Build a client posting to `{base_url}/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Client`] if the underlying client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        referer: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            referer: referer.into(),
            retry,
        })
    }

    /// Build a client from the provider settings in `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self, ProviderError> {
        Self::new(
            &cfg.provider_base_url,
            cfg.provider_api_key.clone(),
            cfg.provider_referer.clone(),
            cfg.provider_timeout(),
            RetryPolicy {
                max_attempts: cfg.provider_max_attempts,
                backoff: cfg.provider_retry_backoff(),
            },
        )
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post `body` (already-serialised JSON) and decode the completion.
    ///
    /// Every attempt sends exactly `body`.
    ///
    /// # Errors
    ///
    /// Returns the last [`ProviderError`] once retries are exhausted, or the
    /// first non-retryable one.
    pub async fn complete(&self, body: &[u8]) -> Result<ProviderResponse, ProviderError> {
        retry_async(|| self.send_once(body), &self.retry, ProviderError::is_retryable).await
    }

    async fn send_once(&self, body: &[u8]) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: ProviderResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        debug!(provider_id = %decoded.id, choices = decoded.choices.len(), "provider response decoded");
        Ok(decoded)
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("retry", &self.retry)
            .finish()
    }
}
