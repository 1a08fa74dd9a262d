//! HTTP text source.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::docs::{BackendError, TextSource};

/// Fetches documents over HTTP(S) with a shared client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextSource for HttpSource {
    async fn get_text(&self, url: &str) -> Result<String, BackendError> {
        tracing::debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| BackendError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "Non-success status");
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| BackendError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(url, bytes = bytes.len(), "Fetched");
        Ok(decode_body(&bytes))
    }
}

/// Decodes a response body as UTF-8, falling back to Windows-1252.
///
/// Older RFC text files are not all valid UTF-8.
#[must_use]
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            tracing::debug!("Body is not UTF-8, decoded as Windows-1252");
            text.into_owned()
        }
    }
}
