use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 20;
const MAX_DELAY_MS: u64 = 500;

/// Error returned when waiting for log records times out.
#[derive(Debug)]
pub struct WaitError {
    path: PathBuf,
    attempts: u32,
    waited: Duration,
    last_content: Option<String>,
    last_error: Option<String>,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out after {} attempts over {:?} waiting for {}. Last content: {}. Last error: {}",
            self.attempts,
            self.waited,
            self.path.display(),
            self.last_content
                .as_deref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or("<empty>"),
            self.last_error
                .as_deref()
                .unwrap_or("file not created or unreadable")
        )
    }
}

impl std::error::Error for WaitError {}

/// Poll a log file until it holds at least `min_lines` lines.
///
/// Uses exponential backoff starting at 20ms, capped at 500ms per wait.
pub async fn wait_for_log_lines<P: AsRef<Path>>(
    path: P,
    min_lines: usize,
    timeout: Duration,
) -> Result<Vec<String>, WaitError> {
    let path = path.as_ref();
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);
    let mut attempts = 0;
    let mut last_error: Option<String> = None;
    let mut last_content: Option<String> = None;

    loop {
        attempts += 1;
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                if lines.len() >= min_lines {
                    return Ok(lines);
                }
                last_content = Some(content);
            }
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    last_error = Some(err.to_string());
                }
            }
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }

        tokio::time::sleep(delay.min(remaining)).await;
        delay = (delay * 2).min(Duration::from_millis(MAX_DELAY_MS));
    }

    Err(WaitError {
        path: path.to_path_buf(),
        attempts,
        waited: start.elapsed(),
        last_content,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn wait_for_log_lines_returns_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("log.csv");
        std::fs::write(&file, "1,\"a\"\n2,\"b\"\n").unwrap();

        let lines = wait_for_log_lines(&file, 2, Duration::from_secs(1))
            .await
            .expect("should read file immediately");
        assert_eq!(lines, vec!["1,\"a\"", "2,\"b\""]);
    }

    #[tokio::test]
    async fn wait_for_log_lines_times_out_with_context() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("missing.csv");

        let err = wait_for_log_lines(&file, 1, Duration::from_millis(1))
            .await
            .expect_err("should time out");
        assert!(
            err.to_string().contains("missing.csv"),
            "error message should reference file path"
        );
    }
}
