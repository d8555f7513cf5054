//! Periodic snapshot logger.
//!
//! A timer task captures the active buffer on every tick and hands the record
//! to a single writer task, so a slow disk never delays the next tick and
//! appends land in tick order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::models::SnapshotRecord;
use super::store::LogDestination;

/// Default time between two snapshots
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(5000);

/// Clock trait for testable time
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Host accessor for the text of the active document
pub trait BufferSource: Send + Sync {
    /// Full text of the active document, or `None` when nothing is open
    fn current_text(&self) -> Option<String>;
}

impl<F> BufferSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_text(&self) -> Option<String> {
        self()
    }
}

struct RunningLogger {
    shutdown_tx: oneshot::Sender<()>,
    timer: JoinHandle<()>,
    writer: JoinHandle<LogDestination>,
}

/// Captures the active buffer on a fixed interval into a session log
pub struct SnapshotLogger {
    interval: Duration,
    clock: Arc<dyn Clock>,
    destination: Option<LogDestination>,
    running: Option<RunningLogger>,
}

impl SnapshotLogger {
    pub fn new(destination: LogDestination, interval: Duration) -> Self {
        Self::with_clock(destination, interval, Arc::new(SystemClock))
    }

    /// Create a logger with a custom clock (for testing)
    pub fn with_clock(
        destination: LogDestination,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            interval,
            clock,
            destination: Some(destination),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin capturing. Calling `start` on a running logger is a no-op.
    pub fn start(&mut self, source: Arc<dyn BufferSource>) {
        if self.running.is_some() {
            warn!("snapshot logger already running");
            return;
        }
        if self.interval.is_zero() {
            error!("snapshot interval must be non-zero");
            return;
        }
        let Some(destination) = self.destination.take() else {
            error!("snapshot logger has no destination");
            return;
        };
        info!(
            "logging snapshots to {} every {:?}",
            destination.path().display(),
            self.interval
        );

        let (record_tx, record_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let writer = tokio::spawn(run_writer(destination, record_rx));
        let timer = tokio::spawn(run_timer(
            self.interval,
            source,
            Arc::clone(&self.clock),
            record_tx,
            shutdown_rx,
        ));

        self.running = Some(RunningLogger {
            shutdown_tx,
            timer,
            writer,
        });
    }

    /// Stop capturing and wait for queued appends to finish. Idempotent.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown_tx.send(());
        if let Err(e) = running.timer.await {
            error!("snapshot timer task failed: {}", e);
        }
        match running.writer.await {
            Ok(destination) => self.destination = Some(destination),
            Err(e) => error!("snapshot writer task failed: {}", e),
        }
        debug!("snapshot logger stopped");
    }
}

async fn run_timer(
    period: Duration,
    source: Arc<dyn BufferSource>,
    clock: Arc<dyn Clock>,
    record_tx: mpsc::UnboundedSender<SnapshotRecord>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    // First capture happens one full period after start
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_captured: Option<DateTime<Utc>> = None;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                let Some(record) = capture(source.as_ref(), clock.as_ref(), &mut last_captured) else {
                    debug!("no active buffer, skipping snapshot");
                    continue;
                };
                if record_tx.send(record).is_err() {
                    error!("snapshot writer is gone, stopping timer");
                    break;
                }
            }
        }
    }
}

/// Build the record for one tick; `None` when there is no text to log
fn capture(
    source: &dyn BufferSource,
    clock: &dyn Clock,
    last_captured: &mut Option<DateTime<Utc>>,
) -> Option<SnapshotRecord> {
    let text = source.current_text().filter(|t| !t.is_empty())?;

    let mut captured_at = clock.now_utc();
    if let Some(last) = *last_captured {
        captured_at = captured_at.max(last);
    }
    *last_captured = Some(captured_at);

    Some(SnapshotRecord::new(captured_at, text))
}

async fn run_writer(
    mut destination: LogDestination,
    mut record_rx: mpsc::UnboundedReceiver<SnapshotRecord>,
) -> LogDestination {
    while let Some(record) = record_rx.recv().await {
        if let Err(e) = destination.append(&record).await {
            error!("dropping snapshot: {}", e);
        }
    }
    destination
}
