use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending commands (1 to [`MAX_QUEUE_CAPACITY`]);
    /// further commands are dropped.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Back-off before the single retry of a duplicate/rate-limited command.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Log in again before retrying.
    #[serde(default = "default_true")]
    pub relogin_on_retry: bool,
    /// Remote result codes meaning "duplicate or rate-limited request".
    #[serde(default = "default_retry_codes")]
    pub retry_codes: Vec<String>,
    /// Window after a stop-charge during which no follow-up poll is appended.
    #[serde(default = "default_stop_charge_cooldown_secs")]
    pub stop_charge_cooldown_secs: u64,
}

/// Upper bound for `queue.capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 10;

fn default_capacity() -> usize {
    MAX_QUEUE_CAPACITY
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_retry_codes() -> Vec<String> {
    vec!["4004".into(), "5091".into()]
}

fn default_stop_charge_cooldown_secs() -> u64 {
    30
}

impl QueueConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn stop_charge_cooldown(&self) -> Duration {
        Duration::from_secs(self.stop_charge_cooldown_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            retry_delay_secs: default_retry_delay_secs(),
            relogin_on_retry: true,
            retry_codes: default_retry_codes(),
            stop_charge_cooldown_secs: default_stop_charge_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Delay between tearing a device down and re-running start-up.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

fn default_restart_delay_secs() -> u64 {
    60
}

impl WatchdogConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}
