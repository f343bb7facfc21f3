//! Bare HTTP transport: one GET, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::constants::CONNECT_TIMEOUT_SECS;
use super::{BookClient, FetchError, FetchResponse};
use crate::user_agent;

/// Innermost client layer backed by a pooled [`reqwest::Client`].
///
/// Any HTTP status is returned as a [`FetchResponse`]; only timeouts,
/// connection failures and undecodable bodies become errors. Bodies are
/// decoded with the response's declared charset, falling back to the
/// configured one (catalog sites commonly serve `gbk` or `big5` without
/// declaring it).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    charset: String,
}

impl HttpTransport {
    /// Builds a transport with the given request timeout and fallback charset.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Builder`] if the underlying client cannot be
    /// constructed.
    pub fn new(timeout: Duration, charset: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(FetchError::Builder)?;

        Ok(Self {
            client,
            charset: charset.into(),
        })
    }

    /// Returns the fallback charset used to decode bodies.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }
}

#[async_trait]
impl BookClient for HttpTransport {
    #[instrument(level = "trace", skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_send(url, e))?;

        let status = response.status().as_u16();
        let body = response.text_with_charset(&self.charset).await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::decode(url, e)
            }
        })?;

        debug!(status, bytes = body.len(), "fetched");
        Ok(FetchResponse { status, body })
    }
}
