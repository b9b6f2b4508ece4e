use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DRIVELINK_POLL_INTERVAL")
            && let Ok(minutes) = value.parse::<u32>()
            && minutes > 0
        {
            self.polling.interval_minutes = minutes;
        }

        if let Some(value) = lookup("DRIVELINK_ACTIVE_POLL_INTERVAL")
            && let Ok(minutes) = value.parse::<u32>()
            && minutes > 0
        {
            self.polling.active_interval_minutes = minutes;
        }

        if let Some(value) = lookup("DRIVELINK_HOME_LAT")
            && let Ok(lat) = value.parse::<f64>()
        {
            self.home.latitude = lat;
        }

        if let Some(value) = lookup("DRIVELINK_HOME_LON")
            && let Ok(lon) = value.parse::<f64>()
        {
            self.home.longitude = lon;
        }

        if let Some(level) = lookup("DRIVELINK_LOG_LEVEL")
            && !level.is_empty()
        {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_apply_parsed_values() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup(&[
            ("DRIVELINK_POLL_INTERVAL", "15"),
            ("DRIVELINK_ACTIVE_POLL_INTERVAL", "1"),
            ("DRIVELINK_HOME_LAT", "51.5"),
            ("DRIVELINK_HOME_LON", "-0.12"),
            ("DRIVELINK_LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.polling.interval_minutes, 15);
        assert_eq!(config.polling.active_interval_minutes, 1);
        assert!((config.home.latitude - 51.5).abs() < f64::EPSILON);
        assert!((config.home.longitude + 0.12).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn unparsable_or_zero_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup(&[
            ("DRIVELINK_POLL_INTERVAL", "0"),
            ("DRIVELINK_ACTIVE_POLL_INTERVAL", "soon"),
            ("DRIVELINK_HOME_LAT", "north"),
        ]));

        assert_eq!(config.polling.interval_minutes, 10);
        assert_eq!(config.polling.active_interval_minutes, 2);
        assert!(config.home.latitude.abs() < f64::EPSILON);
    }
}
