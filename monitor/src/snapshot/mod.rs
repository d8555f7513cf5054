//! Buffer snapshot logging
//!
//! Periodically captures the active document and appends it, timestamped, to a
//! per-session log file.

pub mod capture;
pub mod models;
pub mod store;

// Re-export key types
pub use capture::{BufferSource, Clock, SnapshotLogger, SystemClock, DEFAULT_SNAPSHOT_INTERVAL};
pub use models::SnapshotRecord;
pub use store::{ensure_directory, LogDestination};
