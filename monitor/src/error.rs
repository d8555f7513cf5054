// Error taxonomy for the monitor core
// Every variant is reported at the component boundary; none of them end the session.

use std::path::PathBuf;

/// Errors surfaced by the listener, snapshot logger and status fetcher
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Connection to the signal source failed to open or dropped
    #[error("signal transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound payload was not a valid signal
    #[error("failed to parse signal: {0}")]
    Parse(#[from] serde_json::Error),

    /// Directory provisioning or log append failed
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One-shot status query failed or returned no message
    #[error("status fetch failed: {0}")]
    UpstreamFetch(String),

    /// `set_up()` was called while a connection is still live
    #[error("signal listener already has a live connection")]
    AlreadyConnected,
}

impl MonitorError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MonitorError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::UpstreamFetch(err.to_string())
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
