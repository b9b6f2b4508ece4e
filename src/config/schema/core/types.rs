use super::super::{
    AlarmConfig, HomeConfig, ObservabilityConfig, PollingConfig, QueueConfig, WatchdogConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - resolved at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Display name used in logs and the health registry.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub home: HomeConfig,

    #[serde(default)]
    pub alarms: AlarmConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_device_name() -> String {
    "car".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            device_name: default_device_name(),
            polling: PollingConfig::default(),
            home: HomeConfig::default(),
            alarms: AlarmConfig::default(),
            queue: QueueConfig::default(),
            watchdog: WatchdogConfig::default(),
            logging: LoggingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl LoggingConfig {
    pub fn max_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.level).unwrap_or(tracing::Level::INFO)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}
