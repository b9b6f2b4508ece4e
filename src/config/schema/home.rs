use serde::{Deserialize, Serialize};

const METERS_PER_MILE: f64 = 1_609.344;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Km,
    Mi,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            Self::Km => meters / 1_000.0,
            Self::Mi => meters / METERS_PER_MILE,
        }
    }
}

/// Reference point for `distance_from_home`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomeConfig {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub distance_unit: DistanceUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// 12V battery percentage below which the battery alarm is raised.
    #[serde(default = "default_battery_12v_threshold")]
    pub battery_12v_threshold: f64,
    /// Traction battery percentage below which the battery alarm is raised.
    #[serde(default = "default_ev_battery_threshold")]
    pub ev_battery_threshold: f64,
}

fn default_battery_12v_threshold() -> f64 {
    60.0
}

fn default_ev_battery_threshold() -> f64 {
    20.0
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            battery_12v_threshold: default_battery_12v_threshold(),
            ev_battery_threshold: default_ev_battery_threshold(),
        }
    }
}
