//! Log destination: path selection, lazy directory provisioning, appends.
//!
//! A session writes to exactly one file under the log directory, named after
//! the session start time. The parent chain is created on the first append and
//! the result is cached until an append finds the directory gone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::models::SnapshotRecord;
use crate::error::{MonitorError, Result};

/// Make sure every directory above `path` exists.
///
/// Walks up to the nearest existing ancestor, then creates the missing
/// directories top-down. A directory that appears concurrently counts as
/// success; any other failure is returned.
pub fn ensure_directory(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.is_dir() {
        return Ok(());
    }

    let mut missing = Vec::new();
    let mut cursor = Some(parent);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.is_dir() {
            break;
        }
        missing.push(dir);
        cursor = dir.parent();
    }

    for dir in missing.iter().rev() {
        match fs::create_dir(dir) {
            Ok(()) => debug!("created log directory {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Append-only log file for one session
#[derive(Debug)]
pub struct LogDestination {
    path: PathBuf,
    provisioned: bool,
}

impl LogDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            provisioned: false,
        }
    }

    /// `<log_dir>/activity-YYYY-MM-DD_HH-MM-SS.csv` for a session started at `started_at`.
    ///
    /// If that file already exists, `-1`, `-2`, ... is appended to the stem.
    pub fn for_session(log_dir: &Path, started_at: DateTime<Local>) -> Self {
        let stem = format!("activity-{}", started_at.format("%Y-%m-%d_%H-%M-%S"));
        let mut path = log_dir.join(format!("{}.csv", stem));
        let mut suffix = 1u32;
        while path.exists() {
            path = log_dir.join(format!("{}-{}.csv", stem, suffix));
            suffix += 1;
        }
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the parent directories have been created for this destination
    pub fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    /// Append one record, provisioning the directory chain on first use
    pub async fn append(&mut self, record: &SnapshotRecord) -> Result<()> {
        if !self.provisioned {
            let path = self.path.clone();
            tokio::task::spawn_blocking(move || ensure_directory(&path))
                .await
                .map_err(|e| {
                    MonitorError::filesystem(&self.path, io::Error::new(io::ErrorKind::Other, e))
                })?
                .map_err(|e| MonitorError::filesystem(&self.path, e))?;
            self.provisioned = true;
        }

        let opened = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    // Directory removed mid-session: provision again next time
                    self.provisioned = false;
                }
                return Err(MonitorError::filesystem(&self.path, e));
            }
        };

        file.write_all(record.to_line().as_bytes())
            .await
            .map_err(|e| MonitorError::filesystem(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| MonitorError::filesystem(&self.path, e))?;

        Ok(())
    }
}
