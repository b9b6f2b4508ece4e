use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `0,0` is what an uninitialised position looks like upstream.
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// True when either axis differs from `other` by more than `degrees`.
    pub fn displaced_from(&self, other: &Self, degrees: f64) -> bool {
        (self.latitude - other.latitude).abs() > degrees
            || (self.longitude - other.longitude).abs() > degrees
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let here = Point::new(self.longitude, self.latitude);
        let there = Point::new(other.longitude, other.latitude);
        here.haversine_distance(&there)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Charging situation derived from the recoded plugin code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChargePhase {
    Unplugged,
    PluggedIn,
    Charging,
}

impl ChargePhase {
    /// Recode the raw connector code: `1`/`2` stay as-is while energy flows,
    /// move to `3`/`4` when plugged in but idle, anything else becomes `0`.
    pub fn recode(plugin: u8, charging: bool) -> u8 {
        match plugin {
            1 | 2 if charging => plugin,
            1 | 2 => plugin + 2,
            _ => 0,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 | 2 => Self::Charging,
            3 | 4 => Self::PluggedIn,
            _ => Self::Unplugged,
        }
    }
}

/// Schema-independent snapshot of one poll.
///
/// Every derived field is computed from the same raw payload; a record is
/// never patched with values from a later poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doors_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hood_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunroof_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defrost_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f64>,
    /// Engine running / EV ready to drive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_on: Option<bool>,
    /// Recoded plugin code, see [`ChargePhase::recode`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charger: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_battery_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_12v_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tire_pressure_alarm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_alarm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_home: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StatusRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn charge_phase(&self) -> Option<ChargePhase> {
        self.charger.map(ChargePhase::from_code)
    }

    /// Known position, ignoring the `0,0` placeholder.
    pub fn position(&self) -> Option<Coordinates> {
        self.coordinates.filter(|c| !c.is_unset())
    }
}
