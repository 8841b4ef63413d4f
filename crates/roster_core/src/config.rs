//! Session configuration.

use crate::logging::default_log_level;

/// Avatar used when a store row or draft carries none.
pub const DEFAULT_AVATAR_URL: &str = "https://github.com/shadcn.png";

/// Number of reported anomalies a session keeps before dropping the oldest.
pub const DEFAULT_ANOMALY_HISTORY: usize = 64;

/// Roster session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Fallback avatar URL for students without one.
    pub default_avatar: String,
    /// Upper bound for the anomaly history kept by a session. `0` keeps none.
    pub anomaly_history: usize,
    /// Log level passed to `init_logging` by hosts.
    pub log_level: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            default_avatar: DEFAULT_AVATAR_URL.to_string(),
            anomaly_history: DEFAULT_ANOMALY_HISTORY,
            log_level: default_log_level().to_string(),
        }
    }
}
