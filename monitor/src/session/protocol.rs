// Signal protocol - inbound JSON messages from the signal source
// Flags accept JSON booleans or the "True"/"False" strings the source emits.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Default endpoint of the signal source
pub const DEFAULT_SIGNAL_URL: &str = "ws://localhost:8080";

/// Default endpoint of the one-shot status query
pub const DEFAULT_STATUS_URL: &str = "http://localhost:8080/get_data";

/// Greeting the signal source expects once per connection
pub const HANDSHAKE_PAYLOAD: &str = "something";

/// Maximum characters rendered into the status bar
const STATUS_MAX_CHARS: usize = 80;

/// Boolean flag carried by a signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flag(pub bool);

impl Flag {
    pub fn is_set(self) -> bool {
        self.0
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.0)
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FlagVisitor;

        impl<'de> Visitor<'de> for FlagVisitor {
            type Value = Flag;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean or the string \"True\"/\"False\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Flag, E> {
                Ok(Flag(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Flag, E> {
                if v.eq_ignore_ascii_case("true") {
                    Ok(Flag(true))
                } else if v.eq_ignore_ascii_case("false") {
                    Ok(Flag(false))
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}

/// A decoded message from the signal source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// The user appears to be stuck
    #[serde(rename = "Need help")]
    pub need_help: Flag,
    /// The user appears to be under strain
    #[serde(rename = "Is stressed", default)]
    pub is_stressed: Flag,
    /// Everything else, passed through to the status display
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Signal {
    /// Decode a signal from a raw payload
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Short single-line summary for the status bar
    pub fn status_line(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.need_help.is_set() {
            parts.push("needs help".to_string());
        }
        if self.is_stressed.is_set() {
            parts.push("stressed".to_string());
        }
        for (key, value) in &self.extra {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parts.push(format!("{}: {}", key, rendered));
        }

        if parts.is_empty() {
            return "pulse: ok".to_string();
        }
        truncate_chars(&format!("pulse: {}", parts.join(" | ")), STATUS_MAX_CHARS)
    }
}

/// One-shot status response body
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Truncate to `max_chars` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_flags() {
        let signal = Signal::parse(br#"{"Need help": "True"}"#).unwrap();
        assert!(signal.need_help.is_set());
        assert!(!signal.is_stressed.is_set());
        assert!(signal.extra.is_empty());

        let signal = Signal::parse(br#"{"Need help": "False", "Is stressed": "true"}"#).unwrap();
        assert!(!signal.need_help.is_set());
        assert!(signal.is_stressed.is_set());
    }

    #[test]
    fn parses_boolean_flags() {
        let signal = Signal::parse(br#"{"Need help": true, "Is stressed": false}"#).unwrap();
        assert!(signal.need_help.is_set());
        assert!(!signal.is_stressed.is_set());
    }

    #[test]
    fn keeps_extra_fields() {
        let signal =
            Signal::parse(br#"{"Need help": "False", "load": 0.75, "trend": "up"}"#).unwrap();
        assert_eq!(signal.extra.get("load"), Some(&serde_json::json!(0.75)));
        assert_eq!(signal.extra.get("trend"), Some(&serde_json::json!("up")));
    }

    #[test]
    fn rejects_unknown_flag_value() {
        assert!(Signal::parse(br#"{"Need help": "maybe"}"#).is_err());
        assert!(Signal::parse(br#"{"Need help": 1}"#).is_err());
    }

    #[test]
    fn rejects_missing_help_flag_and_non_objects() {
        assert!(Signal::parse(br#"{"load": 0.5}"#).is_err());
        assert!(Signal::parse(b"[1, 2]").is_err());
        assert!(Signal::parse(b"not json").is_err());
    }

    #[test]
    fn status_line_lists_flags_and_fields() {
        let signal = Signal::parse(br#"{"Need help": "True", "load": "high"}"#).unwrap();
        assert_eq!(signal.status_line(), "pulse: needs help | load: high");

        let quiet = Signal::parse(br#"{"Need help": false}"#).unwrap();
        assert_eq!(quiet.status_line(), "pulse: ok");
    }

    #[test]
    fn status_line_is_truncated() {
        let long = "x".repeat(200);
        let payload = format!(r#"{{"Need help": false, "note": "{}"}}"#, long);
        let signal = Signal::parse(payload.as_bytes()).unwrap();
        let line = signal.status_line();
        assert_eq!(line.chars().count(), STATUS_MAX_CHARS);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_chars("short", 80), "short");
    }
}
