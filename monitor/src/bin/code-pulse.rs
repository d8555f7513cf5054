// code-pulse: terminal host for the activity monitor
//
// Usage:
//   code-pulse [--watch <file>] [--signal-url <ws-url>] [--status-url <http-url>]
//              [--log-dir <dir>] [--interval-ms <ms>]
//
// The watched file stands in for the editor's active document. Prompts are
// shown as terminal notifications and answered on stdin. Ctrl-C ends the session.

use anyhow::{bail, Context, Result};
use clap::Parser;
use code_pulse_lib::session::config::Config;
use code_pulse_lib::session::controller::{CoreController, HostCapabilities};
use code_pulse_lib::session::notify::TerminalHost;
use code_pulse_lib::snapshot::BufferSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File treated as the active document
    #[arg(short, long)]
    watch: Option<PathBuf>,

    /// WebSocket endpoint of the signal source
    #[arg(long)]
    signal_url: Option<String>,

    /// HTTP endpoint of the one-shot status query
    #[arg(long)]
    status_url: Option<String>,

    /// Directory for the per-session snapshot log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Milliseconds between buffer snapshots
    #[arg(long)]
    interval_ms: Option<u64>,
}

/// Reads the watched file on every snapshot tick.
///
/// `BufferSource` is synchronous, so this is a blocking read on the timer
/// task. One small file every few seconds is fine; an editor host would hand
/// over its in-memory buffer instead.
struct FileBuffer {
    path: Option<PathBuf>,
}

impl BufferSource for FileBuffer {
    fn current_text(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = Config::from_env();

    if let Some(url) = &args.signal_url {
        config.signal_url = url.clone();
    }
    if let Some(url) = &args.status_url {
        config.status_url = url.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(ms) = args.interval_ms {
        if ms == 0 {
            bail!("--interval-ms must be greater than zero");
        }
        config.snapshot_interval = Duration::from_millis(ms);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    match &args.watch {
        Some(path) if !path.exists() => {
            warn!("{} does not exist yet; ticks are skipped until it does", path.display())
        }
        Some(_) => {}
        None => warn!("no --watch file given; no snapshots will be written"),
    }

    let host = Arc::new(TerminalHost::default());
    let capabilities = HostCapabilities {
        buffer: Arc::new(FileBuffer {
            path: args.watch.clone(),
        }),
        notifier: host.clone(),
        status: host,
    };

    let mut controller = CoreController::new(&config, capabilities);
    controller.start_session().await;
    info!("snapshots go to {}", controller.log_path().display());

    signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("shutting down...");
    controller.shutdown().await;
    Ok(())
}
