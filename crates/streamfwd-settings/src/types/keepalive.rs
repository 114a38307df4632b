//! Keepalive settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default seconds between keepalive writes on an idle SSE stream.
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 15;
/// Smallest accepted keepalive interval, in seconds.
pub const MIN_KEEPALIVE_INTERVAL_SECS: u64 = 1;
/// Largest accepted keepalive interval, in seconds.
pub const MAX_KEEPALIVE_INTERVAL_SECS: u64 = 3600;

/// SSE keepalive injection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepaliveSettings {
    /// Whether idle SSE streams get periodic `:` comment lines.
    pub enabled: bool,
    /// Idle time before a keepalive write, in seconds.
    pub interval_secs: u64,
}

impl KeepaliveSettings {
    /// The interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
        }
    }
}
