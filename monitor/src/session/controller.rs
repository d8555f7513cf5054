//! Session controller.
//!
//! Owns one monitoring session: the signal listener, the snapshot logger, the
//! status fetcher and the session context (host capabilities, throttle state,
//! clock) that every component receives at construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::session::config::Config;
use crate::session::fetch::StatusFetcher;
use crate::session::listener::{ListenerState, SignalListener};
use crate::session::notify::{NotificationSink, StatusSink};
use crate::session::protocol::Signal;
use crate::session::throttle::{NotificationCategory, NotificationThrottle, SharedThrottle};
use crate::snapshot::{BufferSource, Clock, LogDestination, SnapshotLogger, SystemClock};

pub const HELP_PROMPT: &str = "It looks like you might be stuck. Would you like some help?";
pub const HELP_CHOICES: [&str; 2] = ["Yes", "No"];
pub const HELP_MESSAGE: &str =
    "Try splitting the problem into smaller steps, or explain it out loud to someone.";
pub const PAUSE_MESSAGE: &str = "You seem stressed. Consider taking a short break.";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data from the status server.";
pub const LOGGING_STARTED_MESSAGE: &str = "Now logging changes in open file";

/// Capabilities the host hands to the core
#[derive(Clone)]
pub struct HostCapabilities {
    pub buffer: Arc<dyn BufferSource>,
    pub notifier: Arc<dyn NotificationSink>,
    pub status: Arc<dyn StatusSink>,
}

/// State shared by all components for the lifetime of one session
#[derive(Clone)]
pub struct SessionContext {
    pub host: HostCapabilities,
    pub throttle: SharedThrottle,
    pub clock: Arc<dyn Clock>,
    pub started_at: DateTime<Local>,
}

impl SessionContext {
    pub fn new(host: HostCapabilities) -> Self {
        Self::with_clock(host, Arc::new(SystemClock))
    }

    /// Create a context with a custom clock (for testing)
    pub fn with_clock(host: HostCapabilities, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now_utc().with_timezone(&Local);
        Self {
            host,
            throttle: NotificationThrottle::shared(),
            clock,
            started_at,
        }
    }

    /// Run a throttle decision for `category` at the current time
    pub fn should_notify(&self, category: NotificationCategory) -> bool {
        let now_ms = self.clock.now_utc().timestamp_millis();
        let mut throttle = self
            .throttle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        throttle.decide_category(category, now_ms)
    }
}

/// Routes decoded signals to the status sink and throttled prompts
#[derive(Clone)]
pub struct SignalDispatcher {
    ctx: SessionContext,
}

impl SignalDispatcher {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Handle one signal; returns the categories that fired a notification
    pub fn dispatch(&self, signal: &Signal) -> Vec<NotificationCategory> {
        self.ctx.host.status.update_status(&signal.status_line());

        let mut fired = Vec::new();
        if signal.need_help.is_set() && self.ctx.should_notify(NotificationCategory::Help) {
            self.offer_help();
            fired.push(NotificationCategory::Help);
        }
        if signal.is_stressed.is_set() && self.ctx.should_notify(NotificationCategory::Pause) {
            self.ctx.host.notifier.show_warning(PAUSE_MESSAGE);
            fired.push(NotificationCategory::Pause);
        }
        fired
    }

    /// Consume signals until the listener goes away
    pub async fn run(self, mut signals: mpsc::UnboundedReceiver<Signal>) {
        while let Some(signal) = signals.recv().await {
            let fired = self.dispatch(&signal);
            if !fired.is_empty() {
                debug!("notifications fired: {:?}", fired);
            }
        }
        debug!("signal stream finished");
    }

    // The prompt runs as its own task so waiting on the user never holds up
    // the next signal.
    fn offer_help(&self) {
        let notifier = Arc::clone(&self.ctx.host.notifier);
        tokio::spawn(async move {
            let choice = notifier.ask(HELP_PROMPT, &HELP_CHOICES).await;
            if choice.as_deref() == Some(HELP_CHOICES[0]) {
                notifier.show_info(HELP_MESSAGE);
            }
        });
    }
}

/// Composes listener, logger and fetcher into one session
pub struct CoreController {
    ctx: SessionContext,
    listener: SignalListener,
    logger: SnapshotLogger,
    fetcher: StatusFetcher,
    log_path: PathBuf,
    dispatch_task: Option<JoinHandle<()>>,
    active: bool,
}

impl CoreController {
    pub fn new(config: &Config, host: HostCapabilities) -> Self {
        Self::with_context(config, SessionContext::new(host))
    }

    pub fn with_context(config: &Config, ctx: SessionContext) -> Self {
        let destination = LogDestination::for_session(&config.log_dir, ctx.started_at);
        let log_path = destination.path().to_path_buf();
        let logger = SnapshotLogger::with_clock(
            destination,
            config.snapshot_interval,
            Arc::clone(&ctx.clock),
        );

        Self {
            listener: SignalListener::new(&config.signal_url, &config.handshake),
            fetcher: StatusFetcher::with_timeout(&config.status_url, config.status_timeout),
            logger,
            log_path,
            ctx,
            dispatch_task: None,
            active: false,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Host command: start the session, then show the status message.
    ///
    /// The listener and logger are running before the status query is sent,
    /// so a slow status endpoint never holds them back. Re-invoking while a
    /// session is active only repeats the status message.
    pub async fn start_session(&mut self) {
        let notifier = Arc::clone(&self.ctx.host.notifier);
        if self.active {
            debug!("session already active");
        } else {
            self.start();
            notifier.show_info(LOGGING_STARTED_MESSAGE);
        }

        match self.fetcher.fetch_message().await {
            Some(message) => notifier.show_info(&message),
            None => notifier.show_error(FETCH_FAILED_MESSAGE),
        }
    }

    /// Open the signal listener and start the snapshot logger
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;

        match self.listener.set_up() {
            Ok(signals) => {
                let dispatcher = SignalDispatcher::new(self.ctx.clone());
                self.dispatch_task = Some(tokio::spawn(dispatcher.run(signals)));
            }
            Err(e) => error!("signal listener not started: {}", e),
        }

        self.logger.start(Arc::clone(&self.ctx.host.buffer));
        info!("session started");
    }

    /// Stop the logger, then close the connection if it is still open
    pub async fn shutdown(&mut self) {
        self.logger.stop().await;
        self.listener.close().await;
        if let Some(task) = self.dispatch_task.take() {
            if let Err(e) = task.await {
                error!("signal dispatch task failed: {}", e);
            }
        }
        if self.active {
            info!("session stopped");
        }
        self.active = false;
    }
}
