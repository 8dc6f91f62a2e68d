use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RETENTION_SECS: u64 = 86_400;
pub const DEFAULT_INTERVAL_SECS: u64 = 120;

/// Expiration job settings shared by every tenant's janitor.
///
/// The camel-case keys of older deployment files (`lifeTimeInSec`,
/// `jobIntervalInSec`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Start the expiration job when a tenant handle is built (default: false)
    #[serde(default)]
    pub active: bool,
    /// Age after which ttld-flagged rows are deleted (default: 86400)
    #[serde(default = "default_retention_secs", alias = "lifeTimeInSec")]
    pub retention_secs: u64,
    /// Seconds between expiration passes (default: 120)
    #[serde(default = "default_interval_secs", alias = "jobIntervalInSec")]
    pub interval_secs: u64,
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl JanitorConfig {
    pub fn active(retention_secs: u64, interval_secs: u64) -> Self {
        Self {
            active: true,
            retention_secs,
            interval_secs,
        }
    }

    /// Retention window; zero means "unset" and falls back to the default.
    pub fn effective_retention_secs(&self) -> u64 {
        if self.retention_secs == 0 {
            DEFAULT_RETENTION_SECS
        } else {
            self.retention_secs
        }
    }

    /// Tick period; zero means "unset" and falls back to the default.
    pub fn interval(&self) -> Duration {
        let secs = if self.interval_secs == 0 {
            DEFAULT_INTERVAL_SECS
        } else {
            self.interval_secs
        };
        Duration::from_secs(secs)
    }
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            active: false,
            retention_secs: default_retention_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}
