use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Poll interval while the car is idle (normal mode).
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    /// Poll interval while the car is in use (active mode).
    #[serde(default = "default_active_interval_minutes")]
    pub active_interval_minutes: u32,
    /// Ask the car itself instead of the cloud cache at most this often.
    /// 0 keeps direct refreshes to the start-up poll.
    #[serde(default)]
    pub force_refresh_minutes: u32,
}

fn default_interval_minutes() -> u32 {
    10
}

fn default_active_interval_minutes() -> u32 {
    2
}

impl PollingConfig {
    pub fn normal_interval(&self) -> Duration {
        minutes(self.interval_minutes)
    }

    pub fn active_interval(&self) -> Duration {
        minutes(self.active_interval_minutes)
    }

    pub fn force_refresh_interval(&self) -> Option<Duration> {
        (self.force_refresh_minutes > 0).then(|| minutes(self.force_refresh_minutes))
    }
}

fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value.max(1)) * 60)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            active_interval_minutes: default_active_interval_minutes(),
            force_refresh_minutes: 0,
        }
    }
}
