// One-shot status query against the signal source's HTTP endpoint
// A failed or timed-out query yields None; callers must surface that to the user.

use crate::error::{MonitorError, Result};
use crate::session::protocol::StatusResponse;
use std::time::Duration;
use tracing::{debug, error};

/// Upper bound on one status query, connect through body
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches the current status message from the signal source
#[derive(Debug, Clone)]
pub struct StatusFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl StatusFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_STATUS_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the endpoint, failing on transport errors, non-2xx status,
    /// a body without a message, or no answer within the timeout.
    pub async fn try_fetch(&self) -> Result<String> {
        tokio::time::timeout(self.timeout, self.request())
            .await
            .map_err(|_| {
                MonitorError::UpstreamFetch(format!("no response within {:?}", self.timeout))
            })?
    }

    async fn request(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body: StatusResponse = response.json().await?;

        body.message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| MonitorError::UpstreamFetch("response carried no message".to_string()))
    }

    /// Query the endpoint, reporting failures and returning `None` instead
    pub async fn fetch_message(&self) -> Option<String> {
        match self.try_fetch().await {
            Ok(message) => {
                debug!("status message from {}: {}", self.url, message);
                Some(message)
            }
            Err(e) => {
                error!("error fetching status from {}: {}", self.url, e);
                None
            }
        }
    }
}
