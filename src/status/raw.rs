//! The three upstream status shapes, modelled as explicit serde types.
//!
//! Upstream is loose about scalar types: the same flag arrives as `true`,
//! `1` or `"1"` depending on vehicle generation, and numbers sometimes come
//! quoted. [`Flag`] and [`Number`] absorb that.

use crate::vehicle::Location;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// What one poll fetched from the vehicle client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSnapshot {
    /// Payload of `full_status` or `status`.
    pub status: serde_json::Value,
    /// Separate `location()` result, only fetched for the legacy-simple shape.
    pub location: Option<Location>,
    /// Separate `odometer()` result, only fetched for the legacy-simple shape.
    pub odometer: Option<f64>,
}

impl PollSnapshot {
    pub fn new(status: serde_json::Value) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// Tagged union over the upstream schemas, picked by discriminating keys.
#[derive(Debug, Clone)]
pub enum RawStatus {
    LegacyFull(LegacyFullStatus),
    LegacySimple(LegacySimpleStatus),
    Current(Box<CurrentStatus>),
}

const CURRENT_KEYS: [&str; 4] = ["Cabin", "Drivetrain", "Green", "Body"];
const LEGACY_FULL_KEY: &str = "vehicleStatus";
const LEGACY_SIMPLE_KEYS: [&str; 4] = ["doorLock", "airCtrlOn", "engine", "evStatus"];

impl RawStatus {
    /// `Ok(None)` when the payload matches none of the known shapes.
    pub fn detect(snapshot: &PollSnapshot) -> Result<Option<Self>, serde_json::Error> {
        let Some(object) = snapshot.status.as_object() else {
            return Ok(None);
        };
        let has = |key: &str| object.contains_key(key);

        if CURRENT_KEYS.iter().any(|key| has(key)) {
            let status = CurrentStatus::deserialize(&snapshot.status)?;
            return Ok(Some(Self::Current(Box::new(status))));
        }
        if has(LEGACY_FULL_KEY) {
            let status = LegacyFullStatus::deserialize(&snapshot.status)?;
            return Ok(Some(Self::LegacyFull(status)));
        }
        if LEGACY_SIMPLE_KEYS.iter().any(|key| has(key)) {
            let status = LegacyVehicleStatus::deserialize(&snapshot.status)?;
            return Ok(Some(Self::LegacySimple(LegacySimpleStatus {
                status,
                location: snapshot.location,
                odometer: snapshot.odometer,
            })));
        }
        Ok(None)
    }

    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::LegacyFull(_) => "legacy-full",
            Self::LegacySimple(_) => "legacy-simple",
            Self::Current(_) => "current",
        }
    }
}

// ─── Loose scalars ──────────────────────────────────────────────────────────

/// Boolean that may arrive as bool, number or string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flag(pub bool);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(Self(match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => b,
            Repr::Int(i) => i != 0,
            Repr::Float(f) => f != 0.0,
            Repr::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "on" | "yes"
            ),
        }))
    }
}

/// Number that may arrive quoted. Unparsable text becomes `None` upstream of
/// this type via `Option<Number>` + `deserialize_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Number(pub f64);

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Float(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Float(f) => Ok(Self(f)),
            Repr::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("not a number: {s}"))),
        }
    }
}

impl Number {
    /// Connector codes are small non-negative integers.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_code(self) -> u8 {
        if self.0.is_finite() && (0.0..=f64::from(u8::MAX)).contains(&self.0) {
            self.0.round() as u8
        } else {
            0
        }
    }
}

/// Cabin temperature as reported: a number, a numeric string, a legacy hex
/// step code such as `"0EH"`, or the `"OFF"` sentinel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTemperature {
    Number(f64),
    Text(String),
}

const LEGACY_TEMP_BASE: f64 = 14.0;
const LEGACY_TEMP_STEP: f64 = 0.5;

impl RawTemperature {
    pub fn celsius(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("off") || text.is_empty() {
                    return None;
                }
                if let Ok(value) = text.parse::<f64>() {
                    return Some(value);
                }
                let code = text.strip_suffix(['H', 'h'])?;
                let step = u8::from_str_radix(code, 16).ok()?;
                Some(LEGACY_TEMP_BASE + f64::from(step) * LEGACY_TEMP_STEP)
            }
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ValueOf<T> {
    #[serde(default = "none", deserialize_with = "lenient")]
    pub value: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

// ─── Legacy shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyVehicleStatus {
    #[serde(deserialize_with = "lenient")]
    pub door_lock: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub door_open: Option<BTreeMap<String, Flag>>,
    #[serde(deserialize_with = "lenient")]
    pub window_open: Option<BTreeMap<String, Flag>>,
    #[serde(deserialize_with = "lenient")]
    pub trunk_open: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub hood_open: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub sunroof_open: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub air_ctrl_on: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub defrost: Option<Flag>,
    pub air_temp: Option<ValueOf<RawTemperature>>,
    #[serde(deserialize_with = "lenient")]
    pub engine: Option<Flag>,
    pub ev_status: Option<LegacyEvStatus>,
    pub battery: Option<LegacyBattery>,
    pub tire_pressure_lamp: Option<LegacyTireLamp>,
    #[serde(deserialize_with = "lenient")]
    pub fuel_level: Option<Number>,
    pub dte: Option<ValueOf<Number>>,
    #[serde(deserialize_with = "lenient")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyEvStatus {
    /// Energy currently flowing.
    #[serde(deserialize_with = "lenient")]
    pub battery_charge: Option<Flag>,
    /// Traction battery state of charge, percent.
    #[serde(deserialize_with = "lenient")]
    pub battery_status: Option<Number>,
    /// Connector engaged: 0 none, 1 fast, 2 slow.
    #[serde(deserialize_with = "lenient")]
    pub battery_plugin: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyBattery {
    #[serde(deserialize_with = "lenient")]
    pub bat_soc: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyTireLamp {
    #[serde(deserialize_with = "lenient")]
    pub tire_pressure_lamp_all: Option<Flag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyFullStatus {
    pub vehicle_status: LegacyVehicleStatus,
    pub vehicle_location: Option<LegacyLocation>,
    pub odometer: Option<ValueOf<Number>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyLocation {
    pub coord: Option<LegacyCoord>,
    pub speed: Option<ValueOf<Number>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyCoord {
    #[serde(deserialize_with = "lenient")]
    pub lat: Option<Number>,
    #[serde(deserialize_with = "lenient")]
    pub lon: Option<Number>,
}

/// Legacy status plus the separately fetched location and odometer.
#[derive(Debug, Clone, Default)]
pub struct LegacySimpleStatus {
    pub status: LegacyVehicleStatus,
    pub location: Option<Location>,
    pub odometer: Option<f64>,
}

// ─── Current shape ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CurrentStatus {
    #[serde(deserialize_with = "lenient")]
    pub date: Option<String>,
    pub location: Option<CurrentLocation>,
    pub drivetrain: Option<Drivetrain>,
    pub cabin: Option<Cabin>,
    pub body: Option<Body>,
    pub green: Option<Green>,
    pub electronics: Option<Electronics>,
    pub chassis: Option<Chassis>,
    #[serde(deserialize_with = "lenient")]
    pub driving_ready: Option<Flag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CurrentLocation {
    pub geo_coord: Option<GeoCoord>,
    pub speed: Option<PascalValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GeoCoord {
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<Number>,
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PascalValue {
    #[serde(deserialize_with = "lenient")]
    pub value: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Drivetrain {
    #[serde(deserialize_with = "lenient")]
    pub odometer: Option<Number>,
    pub fuel_system: Option<FuelSystem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FuelSystem {
    #[serde(deserialize_with = "lenient")]
    pub fuel_level: Option<Number>,
    #[serde(rename = "DTE")]
    pub dte: Option<DistanceToEmpty>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DistanceToEmpty {
    #[serde(deserialize_with = "lenient")]
    pub total: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cabin {
    pub door: Option<Seats<DoorState>>,
    pub window: Option<Seats<Opening>>,
    #[serde(rename = "HVAC")]
    pub hvac: Option<Hvac>,
}

/// Per-seat layout used for doors and windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Seats<T> {
    #[serde(default = "none")]
    pub row1: Option<FrontRow<T>>,
    #[serde(default = "none")]
    pub row2: Option<RearRow<T>>,
}

impl<T> Default for Seats<T> {
    fn default() -> Self {
        Self {
            row1: None,
            row2: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FrontRow<T> {
    #[serde(default = "none")]
    pub driver: Option<T>,
    #[serde(default = "none")]
    pub passenger: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RearRow<T> {
    #[serde(default = "none")]
    pub left: Option<T>,
    #[serde(default = "none")]
    pub right: Option<T>,
}

impl<T> Seats<T> {
    /// The four enumerated positions; absent ones are `None`.
    pub fn positions(&self) -> [Option<&T>; 4] {
        let front = self.row1.as_ref();
        let rear = self.row2.as_ref();
        [
            front.and_then(|r| r.driver.as_ref()),
            front.and_then(|r| r.passenger.as_ref()),
            rear.and_then(|r| r.left.as_ref()),
            rear.and_then(|r| r.right.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DoorState {
    #[serde(deserialize_with = "lenient")]
    pub open: Option<Flag>,
    #[serde(deserialize_with = "lenient")]
    pub lock: Option<Flag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Opening {
    #[serde(deserialize_with = "lenient")]
    pub open: Option<Flag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Hvac {
    pub row1: Option<HvacRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HvacRow {
    pub driver: Option<HvacZone>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HvacZone {
    pub temperature: Option<HvacTemperature>,
    pub blower: Option<Blower>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HvacTemperature {
    #[serde(deserialize_with = "lenient")]
    pub value: Option<RawTemperature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Blower {
    #[serde(deserialize_with = "lenient")]
    pub speed_level: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Body {
    pub trunk: Option<Opening>,
    pub hood: Option<Opening>,
    pub sunroof: Option<Sunroof>,
    pub windshield: Option<Windshield>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Sunroof {
    pub glass: Option<Opening>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Windshield {
    pub front: Option<WindshieldFront>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WindshieldFront {
    pub defog: Option<StateOf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StateOf {
    #[serde(deserialize_with = "lenient")]
    pub state: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Green {
    pub battery_management: Option<BatteryManagement>,
    pub charging_information: Option<ChargingInformation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BatteryManagement {
    pub battery_remain: Option<BatteryRemain>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BatteryRemain {
    #[serde(deserialize_with = "lenient")]
    pub ratio: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChargingInformation {
    /// Connector engaged: 0 none, 1 fast, 2 slow.
    pub connector_fastening: Option<StateOf>,
    pub charging: Option<ChargingSession>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChargingSession {
    /// Minutes left; non-zero only while energy flows.
    #[serde(deserialize_with = "lenient")]
    pub remain_time: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Electronics {
    pub battery: Option<AuxBattery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuxBattery {
    #[serde(deserialize_with = "lenient")]
    pub level: Option<Number>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Chassis {
    pub axle: Option<Axle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Axle {
    pub tire: Option<Tire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tire {
    #[serde(deserialize_with = "lenient")]
    pub pressure_low: Option<Flag>,
}
