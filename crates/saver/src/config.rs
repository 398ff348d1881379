//! Saver timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Intervals for the two periodic jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverConfig {
    /// Save job period in milliseconds (default: 10s)
    pub save_interval_ms: u64,
    /// Backup job period in milliseconds (default: 60s)
    pub backup_interval_ms: u64,
    /// Whether the backup job runs at all
    pub backup_enabled: bool,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            save_interval_ms: 10_000,
            backup_interval_ms: 60_000,
            backup_enabled: true,
        }
    }
}

impl SaverConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms.max(1))
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_millis(self.backup_interval_ms.max(1))
    }
}
