//! Relay HTTP retrieval adapter.
//!
//! Implements the [`pipeline::Fetch`] trait with a plain HTTP GET over
//! [`reqwest`]. The response status is not inspected: any response whose body
//! can be read in full is a success.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection handling, TLS, and body streaming live
//! here. The [`pipeline`] crate sees only [`pipeline::Fetch`] and
//! [`pipeline::FetchError`].
//!
//! ## Failure mapping
//!
//! | Failure point | Error |
//! |---------------|-------|
//! | Invalid URL, DNS, connect, TLS, request write | [`FetchError::Transport`] |
//! | Body truncated or connection lost mid-body | [`FetchError::Read`] |
//!
//! No retries and no timeouts are configured on the client.

use async_trait::async_trait;
use pipeline::{Fetch, FetchError, PipelineError};

/// [`Fetch`] implementation issuing one HTTP GET per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with its own connection pool.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ConfigurationError`] if the TLS backend cannot be
    /// initialised or `user_agent` is not a valid header value.
    pub fn new(user_agent: &str) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PipelineError::ConfigurationError {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, target: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(FetchError::transport)?;

        tracing::debug!(url = target, status = %response.status(), "response received");

        let body = response.bytes().await.map_err(FetchError::read)?;
        Ok(body.to_vec())
    }
}
