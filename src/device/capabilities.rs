use crate::host::CapabilityStore;
use crate::status::StatusRecord;
use serde_json::{Map, Value, json};

/// Capability name and value for every field the record carries.
pub fn capability_values(record: &StatusRecord) -> Vec<(&'static str, Value)> {
    let mut values = Vec::new();
    let mut push = |name: &'static str, value: Option<Value>| {
        if let Some(value) = value {
            values.push((name, value));
        }
    };

    push("locked", record.locked.map(Value::from));
    push("closed_locked", record.closed_locked.map(Value::from));
    push("climate_onoff", record.climate_on.map(Value::from));
    push("defrost_onoff", record.defrost_on.map(Value::from));
    push("target_temperature", record.target_temperature.map(Value::from));
    push("engine", record.engine_on.map(Value::from));
    push(
        "ev_charging_state",
        record.charge_phase().map(|phase| Value::from(phase.to_string())),
    );
    push("measure_battery.EV", record.ev_battery_level.map(Value::from));
    push("measure_battery.12V", record.battery_12v_level.map(Value::from));
    push("alarm_battery", record.battery_alarm.map(Value::from));
    push("alarm_tire_pressure", record.tire_pressure_alarm.map(Value::from));
    push("meter_odometer", record.odometer.map(Value::from));
    push("measure_range", record.range.map(Value::from));
    push("measure_fuel", record.fuel_level.map(Value::from));
    push("measure_speed", record.speed.map(Value::from));
    push("distance_from_home", record.distance_from_home.map(Value::from));
    push("location", record.location.clone().map(Value::from));
    push("address", record.address.clone().map(Value::from));
    push("last_update", record.observed_at.clone().map(Value::from));
    values
}

/// Write every mapped value the host device actually has. Returns how many
/// capabilities were set.
pub fn publish(record: &StatusRecord, store: &dyn CapabilityStore) -> usize {
    let mut written = 0;
    for (name, value) in capability_values(record) {
        if store.has_capability(name) {
            store.set(name, value);
            written += 1;
        }
    }
    written
}

/// Token payload handed to flow triggers.
pub fn trigger_tokens(record: &StatusRecord, fired_at: &str) -> Map<String, Value> {
    let mut tokens = Map::new();
    tokens.insert("timestamp".into(), json!(fired_at));
    tokens.insert("location".into(), json!(record.location));
    tokens.insert("address".into(), json!(record.address));
    tokens.insert("odometer".into(), json!(record.odometer));
    tokens.insert("distance_from_home".into(), json!(record.distance_from_home));
    tokens.insert("speed".into(), json!(record.speed));
    if let Some(position) = record.position() {
        tokens.insert("latitude".into(), json!(position.latitude));
        tokens.insert("longitude".into(), json!(position.longitude));
    }
    tokens
}
