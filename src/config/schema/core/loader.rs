use super::Config;
use crate::config::MAX_QUEUE_CAPACITY;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

impl Config {
    /// `~/.drivelink/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".drivelink").join("config.toml"))
    }

    /// Load `path` (or the default path), falling back to defaults when the
    /// file does not exist. Environment overrides and validation are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self {
                config_path,
                ..Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .context("Failed to parse config file")?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_str = self.to_toml()?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let polling = &self.polling;
        if polling.interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "polling.interval_minutes must be at least 1".into(),
            ));
        }
        if polling.active_interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "polling.active_interval_minutes must be at least 1".into(),
            ));
        }
        if polling.active_interval_minutes > polling.interval_minutes {
            return Err(ConfigError::Validation(format!(
                "polling.active_interval_minutes ({}) must not exceed interval_minutes ({})",
                polling.active_interval_minutes, polling.interval_minutes
            )));
        }
        if !(-90.0..=90.0).contains(&self.home.latitude)
            || !(-180.0..=180.0).contains(&self.home.longitude)
        {
            return Err(ConfigError::Validation(format!(
                "home coordinates out of range: {}, {}",
                self.home.latitude, self.home.longitude
            )));
        }
        for (name, value) in [
            ("alarms.battery_12v_threshold", self.alarms.battery_12v_threshold),
            ("alarms.ev_battery_threshold", self.alarms.ev_battery_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a percentage, got {value}"
                )));
            }
        }
        if !(1..=MAX_QUEUE_CAPACITY).contains(&self.queue.capacity) {
            return Err(ConfigError::Validation(format!(
                "queue.capacity must be between 1 and {MAX_QUEUE_CAPACITY}, got {}",
                self.queue.capacity
            )));
        }
        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}
