//! Per-category notification throttling.
//!
//! Each category keeps the epoch time of its last fired notification. A
//! decision to fire commits the new timestamp immediately, so a caller that
//! fails to display the prompt waits a full interval before the next chance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notification categories driven by inbound signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    /// Offer help when the user appears stuck
    Help,
    /// Suggest a short break when the user appears stressed
    Pause,
}

impl NotificationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::Help => "help",
            NotificationCategory::Pause => "pause",
        }
    }

    /// Minimum time between two notifications of this category
    pub fn min_interval(self) -> Duration {
        match self {
            NotificationCategory::Help => Duration::from_secs(5 * 60),
            NotificationCategory::Pause => Duration::from_secs(2 * 60),
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-fired timestamps (epoch ms) keyed by category name
#[derive(Debug, Default)]
pub struct NotificationThrottle {
    last_fired: HashMap<String, i64>,
}

/// Throttle shared between the signal dispatcher and command handlers
pub type SharedThrottle = Arc<Mutex<NotificationThrottle>>;

impl NotificationThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedThrottle {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Returns true (and records `now_ms`) when more than `min_interval_ms`
    /// has passed since the category last fired.
    pub fn decide(&mut self, category: &str, now_ms: i64, min_interval_ms: i64) -> bool {
        let fire = match self.last_fired.get(category) {
            None => true,
            Some(&last) => now_ms.saturating_sub(last) > min_interval_ms,
        };
        if fire {
            self.last_fired.insert(category.to_string(), now_ms);
        }
        fire
    }

    /// Decide for a known category using its configured interval
    pub fn decide_category(&mut self, category: NotificationCategory, now_ms: i64) -> bool {
        let min_interval_ms = category.min_interval().as_millis() as i64;
        self.decide(category.as_str(), now_ms, min_interval_ms)
    }

    /// Timestamp of the last notification fired for `category`, if any
    pub fn last_fired(&self, category: &str) -> Option<i64> {
        self.last_fired.get(category).copied()
    }
}
