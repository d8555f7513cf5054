//! Host-facing notification and status sinks.
//!
//! The core never talks to a UI directly: the host hands in implementations of
//! [`NotificationSink`] and [`StatusSink`] at construction. [`TerminalHost`] is
//! the implementation used by the `code-pulse` binary; it emits terminal
//! notification escape codes (BEL, OSC 9, OSC 777, OSC 99) so the prompts show
//! up as desktop notifications in terminals that support them.
//!
//! Answers are read from stdin by one dedicated thread. The runtime never owns
//! a pending stdin read, so an unanswered prompt cannot hold up shutdown.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::session::protocol::truncate_chars;

/// User-facing prompts provided by the host
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn show_info(&self, text: &str);
    fn show_warning(&self, text: &str);
    fn show_error(&self, text: &str);

    /// Show a warning with labeled choices; resolves to the chosen label, or
    /// `None` if the prompt was dismissed.
    async fn ask(&self, text: &str, choices: &[&str]) -> Option<String>;
}

/// Persistent status display provided by the host
pub trait StatusSink: Send + Sync {
    fn update_status(&self, text: &str);
}

/// Terminal implementation of the host sinks
#[derive(Debug, Clone)]
pub struct TerminalHost {
    title: String,
    answers: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl TerminalHost {
    /// Terminal host answering prompts from stdin
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_answers(title, spawn_stdin_reader())
    }

    /// Terminal host answering prompts from the given line stream
    pub fn with_answers(
        title: impl Into<String>,
        answers: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            title: title.into(),
            answers: Arc::new(Mutex::new(answers)),
        }
    }

    fn notify(&self, level: &str, text: &str) {
        eprintln!("[{}] {}", level, text);
        emit_terminal_notifications(&self.title, &truncate_chars(first_line(text), 80));
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new("code-pulse")
    }
}

#[async_trait]
impl NotificationSink for TerminalHost {
    fn show_info(&self, text: &str) {
        self.notify("info", text);
    }

    fn show_warning(&self, text: &str) {
        self.notify("warning", text);
    }

    fn show_error(&self, text: &str) {
        self.notify("error", text);
    }

    async fn ask(&self, text: &str, choices: &[&str]) -> Option<String> {
        self.notify("warning", text);
        eprintln!("  choose one of: {}", choices.join(" / "));

        let mut answers = self.answers.lock().await;
        // Lines typed before the prompt was shown are not answers to it
        while let Ok(stale) = answers.try_recv() {
            debug!("discarding input typed before the prompt: {:?}", stale);
        }
        let line = answers.recv().await?;
        match_choice(line.trim(), choices)
    }
}

impl StatusSink for TerminalHost {
    fn update_status(&self, text: &str) {
        eprintln!("[status] {}", text);
    }
}

/// Forward stdin lines to a channel from a detached thread.
///
/// The thread exits on EOF, on a read error, or once every receiver is gone.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("code-pulse-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        error!("failed to start stdin reader, prompts will be dismissed: {}", e);
    }
    rx
}

/// Case-insensitive match of user input against the offered labels
fn match_choice(input: &str, choices: &[&str]) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(input))
        .map(|choice| choice.to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// Emits terminal notification escape codes to stdout.
///
/// - BEL (`\x07`) - Universal terminal bell
/// - OSC 9 (iTerm2) - Desktop notification
/// - OSC 777 (Konsole/VTE/Gnome Terminal) - Desktop notification
/// - OSC 99 (kitty) - Desktop notification
pub fn emit_terminal_notifications(title: &str, message: &str) {
    let mut stdout = io::stdout();

    let _ = stdout.write_all(b"\x07");

    // ESC ] 9 ; message BEL
    let osc9 = format!("\x1b]9;{}\x07", escape_osc(message));
    let _ = stdout.write_all(osc9.as_bytes());

    // ESC ] 777 ; notify ; title ; message BEL
    let osc777 = format!(
        "\x1b]777;notify;{};{}\x07",
        escape_osc(title),
        escape_osc(message)
    );
    let _ = stdout.write_all(osc777.as_bytes());

    // ESC ] 99 ; i=1:d=0:p=body ; message ST
    let osc99 = format!(
        "\x1b]99;i=1:d=0:p=title;{}\x1b\\\x1b]99;i=1:d=0:p=body;{}\x1b\\",
        escape_osc(title),
        escape_osc(message)
    );
    let _ = stdout.write_all(osc99.as_bytes());

    let _ = stdout.flush();
}

/// Strips the terminators of OSC sequences from user text
fn escape_osc(s: &str) -> String {
    s.replace('\x07', "")
        .replace('\x1b', "")
        .replace('\n', " ")
        .replace('\r', "")
}
