// Environment configuration helpers for the monitor
// Handles the state/log directories, signal endpoints and snapshot cadence

use crate::session::fetch::DEFAULT_STATUS_TIMEOUT;
use crate::session::protocol::{DEFAULT_SIGNAL_URL, DEFAULT_STATUS_URL, HANDSHAKE_PAYLOAD};
use crate::snapshot::DEFAULT_SNAPSHOT_INTERVAL;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Configuration for one monitoring session
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for persistent state
    pub state_dir: PathBuf,
    /// Directory the per-session snapshot logs are written to
    pub log_dir: PathBuf,
    /// WebSocket endpoint of the signal source
    pub signal_url: String,
    /// HTTP endpoint of the one-shot status query
    pub status_url: String,
    /// Upper bound on the one-shot status query
    pub status_timeout: Duration,
    /// Payload sent once when the signal connection opens
    pub handshake: String,
    /// Time between two buffer snapshots
    pub snapshot_interval: Duration,
}

impl Config {
    /// Create configuration using default paths
    pub fn default_paths() -> Self {
        Self::with_state_dir(Self::default_state_dir())
    }

    /// Configuration rooted at `state_dir`, with default endpoints
    pub fn with_state_dir(state_dir: PathBuf) -> Self {
        Self {
            log_dir: state_dir.join("logs"),
            state_dir,
            signal_url: DEFAULT_SIGNAL_URL.to_string(),
            status_url: DEFAULT_STATUS_URL.to_string(),
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            handshake: HANDSHAKE_PAYLOAD.to_string(),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = match std::env::var("CODE_PULSE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::with_state_dir(PathBuf::from(dir)),
            _ => Self::default_paths(),
        };

        if let Ok(url) = std::env::var("CODE_PULSE_SIGNAL_URL") {
            config.signal_url = url;
        }
        if let Ok(url) = std::env::var("CODE_PULSE_STATUS_URL") {
            config.status_url = url;
        }
        if let Ok(raw) = std::env::var("CODE_PULSE_SNAPSHOT_INTERVAL_MS") {
            match parse_interval_ms(&raw) {
                Some(interval) => config.snapshot_interval = interval,
                None => warn!(
                    "ignoring CODE_PULSE_SNAPSHOT_INTERVAL_MS={:?}: expected a positive integer",
                    raw
                ),
            }
        }

        config
    }

    /// Get the default state directory
    fn default_state_dir() -> PathBuf {
        // All platforms: ~/.code-pulse/ (or /tmp/code-pulse if home unavailable)
        dirs::home_dir()
            .map(|h| h.join(".code-pulse"))
            .unwrap_or_else(|| PathBuf::from("/tmp/code-pulse"))
    }

    /// Get the state directory
    pub fn state_dir(&self) -> &PathBuf {
        &self.state_dir
    }

    /// Get the snapshot log directory
    pub fn log_dir(&self) -> &PathBuf {
        &self.log_dir
    }
}

/// Parse a positive millisecond count
pub fn parse_interval_ms(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => None,
    }
}
