//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client from the `[http]` configuration section
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        Self::with_user_agent(
            &config.user_agent(),
            config.timeout(),
            config.connect_timeout(),
        )
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(
        user_agent: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// GET `url` and decode a JSON body, mapping failures onto [`SourceError`]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        source_name: &str,
    ) -> Result<T, SourceError> {
        tracing::debug!("GET {}", url);

        let response = self.get(url).send().await.map_err(|e| {
            SourceError::Unavailable(format!("Failed to reach {}: {}", source_name, e))
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(SourceError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: format!(
                    "{} API returned status {}: {}",
                    source_name,
                    status,
                    truncate(body.trim(), 200)
                ),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            SourceError::Unavailable(format!("Failed to read {} response: {}", source_name, e))
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            SourceError::Parse(format!("Failed to parse {} JSON: {}", source_name, e))
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }

    #[test]
    fn test_client_from_default_config() {
        assert!(HttpClient::new().is_ok());
    }
}
