//! Test utilities for async session tests
//!
//! Polling helpers so tests wait on observable state (listener state, log
//! file contents, recorded prompts) instead of sleeping for fixed durations.

use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Assert that an async condition eventually succeeds within a timeout.
///
/// Retries `f` every `interval` until it returns `Ok`, panicking with the
/// last error once `timeout` has elapsed.
///
/// ```rust,ignore
/// let lines = assert_eventually(
///     "two snapshot records",
///     Duration::from_secs(3),
///     Duration::from_millis(50),
///     || async {
///         let lines = read_lines(&log_path).await;
///         if lines.len() >= 2 { Ok(lines) } else { Err(format!("only {} lines", lines.len())) }
///     },
/// )
/// .await;
/// ```
pub async fn assert_eventually<F, Fut, T, E>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut f: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = std::time::Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return value,
            Err(e) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    panic!(
                        "Timeout waiting for {}\n\
                         Duration: {:?}\n\
                         Attempts: {}\n\
                         Last error: {}",
                        desc, elapsed, attempt, e
                    );
                }

                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Variant of `assert_eventually` that takes a boolean condition.
pub async fn assert_eventually_bool<F, Fut>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut f: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        if f().await {
            return;
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            panic!(
                "Timeout waiting for {}\n\
                 Duration: {:?}\n\
                 Attempts: {}\n\
                 Condition never became true",
                desc, elapsed, attempt
            );
        }

        tokio::time::sleep(interval).await;
    }
}

/// Lines of a log file; empty when the file does not exist yet
pub async fn read_lines(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
