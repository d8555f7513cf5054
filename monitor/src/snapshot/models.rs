//! Snapshot record model and its on-disk line format.

use chrono::{DateTime, Utc};

/// One timestamped capture of the active buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub captured_at: DateTime<Utc>,
    pub text: String,
}

impl SnapshotRecord {
    pub fn new(captured_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            captured_at,
            text: text.into(),
        }
    }

    /// Render as `<epoch-seconds>,<quoted-text>\n`
    pub fn to_line(&self) -> String {
        format!(
            "{},{}\n",
            format_epoch_seconds(&self.captured_at),
            quote_field(&self.text)
        )
    }
}

/// Epoch seconds with millisecond precision and no trailing zeros
pub fn format_epoch_seconds(ts: &DateTime<Utc>) -> String {
    let millis = ts.timestamp_millis();
    let secs = millis.div_euclid(1000);
    let frac = millis.rem_euclid(1000);
    if frac == 0 {
        return secs.to_string();
    }
    let frac = format!("{:03}", frac);
    format!("{}.{}", secs, frac.trim_end_matches('0'))
}

/// Wrap in double quotes, doubling embedded quotes
fn quote_field(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
