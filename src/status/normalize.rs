use super::raw::{
    CurrentStatus, Flag, LegacyFullStatus, LegacySimpleStatus, LegacyVehicleStatus, Number,
    PollSnapshot, RawStatus, Seats,
};
use super::record::{ChargePhase, Coordinates, StatusRecord};
use crate::config::{AlarmConfig, HomeConfig};
use crate::vehicle::Geocoder;

/// Everything normalization needs besides the raw payload.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Record produced by the previous poll (empty on first run).
    pub previous: &'a StatusRecord,
    pub home: &'a HomeConfig,
    pub alarms: &'a AlarmConfig,
}

/// Turn one poll's raw payload into a canonical record.
///
/// Never fails: an absent or unrecognised payload yields an empty record.
pub fn normalize(snapshot: Option<&PollSnapshot>, ctx: &NormalizeContext<'_>) -> StatusRecord {
    let Some(snapshot) = snapshot else {
        return StatusRecord::default();
    };

    let raw = match RawStatus::detect(snapshot) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("status payload matches no known schema");
            return StatusRecord::default();
        }
        Err(error) => {
            tracing::warn!(%error, "status payload could not be decoded");
            return StatusRecord::default();
        }
    };

    let (mut record, reported_temperature) = match &raw {
        RawStatus::LegacyFull(status) => from_legacy_full(status),
        RawStatus::LegacySimple(status) => from_legacy_simple(status),
        RawStatus::Current(status) => from_current(status),
    };
    tracing::trace!(schema = raw.schema_name(), "normalized status payload");

    record.target_temperature = if record.climate_on == Some(true) {
        reported_temperature.or(ctx.previous.target_temperature)
    } else {
        ctx.previous.target_temperature
    };

    if record.odometer.is_none_or(|km| km == 0.0) {
        record.odometer = ctx.previous.odometer;
    }

    record.distance_from_home = record.position().map(|here| {
        let home = Coordinates::new(ctx.home.latitude, ctx.home.longitude);
        round1(ctx.home.distance_unit.from_meters(here.distance_to(&home)))
    });

    record.battery_alarm = battery_alarm(&record, ctx.alarms);
    record
}

/// Fill `location` and `address` from the geocoder. A failed lookup leaves
/// both absent.
pub async fn resolve_place(record: &mut StatusRecord, geocoder: &dyn Geocoder) {
    let Some(position) = record.position() else {
        return;
    };
    match geocoder.resolve(position).await {
        Ok(place) => {
            record.location = Some(place.display_location);
            record.address = Some(place.address);
        }
        Err(error) => {
            tracing::debug!(%error, %position, "reverse geocoding failed");
            record.location = None;
            record.address = None;
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn battery_alarm(record: &StatusRecord, alarms: &AlarmConfig) -> Option<bool> {
    let low_12v = record
        .battery_12v_level
        .map(|level| level < alarms.battery_12v_threshold);
    let low_ev = record
        .ev_battery_level
        .map(|level| level < alarms.ev_battery_threshold);
    match (low_12v, low_ev) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
    }
}

fn flag(value: Option<Flag>) -> Option<bool> {
    value.map(|f| f.0)
}

fn number(value: Option<Number>) -> Option<f64> {
    value.map(|n| n.0).filter(|n| n.is_finite())
}

// ─── Legacy ─────────────────────────────────────────────────────────────────

fn from_legacy_full(raw: &LegacyFullStatus) -> (StatusRecord, Option<f64>) {
    let (mut record, temperature) = from_legacy_status(&raw.vehicle_status);

    if let Some(location) = &raw.vehicle_location {
        record.coordinates = location.coord.as_ref().and_then(|coord| {
            Some(Coordinates::new(number(coord.lat)?, number(coord.lon)?))
        });
        record.speed = location
            .speed
            .as_ref()
            .and_then(|speed| number(speed.value));
    }
    record.odometer = raw.odometer.as_ref().and_then(|o| number(o.value));
    (record, temperature)
}

fn from_legacy_simple(raw: &LegacySimpleStatus) -> (StatusRecord, Option<f64>) {
    let (mut record, temperature) = from_legacy_status(&raw.status);

    if let Some(location) = raw.location {
        record.coordinates = Some(Coordinates::new(location.latitude, location.longitude));
        record.speed = location.speed;
    }
    record.odometer = raw.odometer;
    (record, temperature)
}

/// Shared by both legacy shapes. Missing door/window/opening fields count
/// as closed.
fn from_legacy_status(status: &LegacyVehicleStatus) -> (StatusRecord, Option<f64>) {
    let all_closed = |openings: &Option<std::collections::BTreeMap<String, Flag>>| {
        openings
            .as_ref()
            .is_none_or(|map| map.values().all(|open| !open.0))
    };

    let locked = flag(status.door_lock);
    let doors_closed = all_closed(&status.door_open);
    let windows_closed = all_closed(&status.window_open);
    let trunk_closed = !flag(status.trunk_open).unwrap_or(false);
    let hood_closed = !flag(status.hood_open).unwrap_or(false);
    let sunroof_closed = !flag(status.sunroof_open).unwrap_or(false);

    let ev = status.ev_status.as_ref();
    let charger = ev.and_then(|ev| {
        let plugin = ev.battery_plugin?.as_code();
        let charging = flag(ev.battery_charge).unwrap_or(false);
        Some(ChargePhase::recode(plugin, charging))
    });

    let record = StatusRecord {
        observed_at: status.time.clone(),
        locked,
        doors_closed: Some(doors_closed),
        windows_closed: Some(windows_closed),
        trunk_closed: Some(trunk_closed),
        hood_closed: Some(hood_closed),
        sunroof_closed: Some(sunroof_closed),
        closed_locked: Some(
            locked.unwrap_or(false)
                && doors_closed
                && windows_closed
                && trunk_closed
                && hood_closed
                && sunroof_closed,
        ),
        climate_on: flag(status.air_ctrl_on),
        defrost_on: flag(status.defrost),
        engine_on: flag(status.engine),
        charger,
        ev_battery_level: ev.and_then(|ev| number(ev.battery_status)),
        battery_12v_level: status.battery.as_ref().and_then(|b| number(b.bat_soc)),
        range: status.dte.as_ref().and_then(|d| number(d.value)),
        fuel_level: number(status.fuel_level),
        tire_pressure_alarm: status
            .tire_pressure_lamp
            .as_ref()
            .and_then(|lamp| flag(lamp.tire_pressure_lamp_all)),
        ..StatusRecord::default()
    };

    let temperature = status
        .air_temp
        .as_ref()
        .and_then(|t| t.value.as_ref())
        .and_then(super::raw::RawTemperature::celsius);
    (record, temperature)
}

// ─── Current ────────────────────────────────────────────────────────────────

/// Every enumerated seat position must be present and satisfy `check`.
fn every_position<T>(seats: Option<&Seats<T>>, check: impl Fn(&T) -> bool) -> bool {
    seats.is_some_and(|seats| {
        seats
            .positions()
            .iter()
            .all(|position| position.is_some_and(&check))
    })
}

fn from_current(raw: &CurrentStatus) -> (StatusRecord, Option<f64>) {
    let cabin = raw.cabin.as_ref();
    let body = raw.body.as_ref();
    let doors = cabin.and_then(|c| c.door.as_ref());
    let windows = cabin.and_then(|c| c.window.as_ref());

    let is_closed = |open: Option<Flag>| open.is_some_and(|f| !f.0);

    let locked = doors.map(|_| every_position(doors, |door| flag(door.lock) == Some(true)));
    let doors_closed = every_position(doors, |door| is_closed(door.open));
    let windows_closed = every_position(windows, |window| is_closed(window.open));
    let trunk_closed = body
        .and_then(|b| b.trunk.as_ref())
        .is_some_and(|trunk| is_closed(trunk.open));
    let hood_closed = body
        .and_then(|b| b.hood.as_ref())
        .is_some_and(|hood| is_closed(hood.open));
    // Not every model has a sunroof; only a reported one must be shut.
    let sunroof_closed = body
        .and_then(|b| b.sunroof.as_ref())
        .and_then(|s| s.glass.as_ref())
        .is_none_or(|glass| is_closed(glass.open));

    let hvac = cabin
        .and_then(|c| c.hvac.as_ref())
        .and_then(|h| h.row1.as_ref())
        .and_then(|row| row.driver.as_ref());
    let climate_on = hvac
        .and_then(|zone| zone.blower.as_ref())
        .and_then(|blower| number(blower.speed_level))
        .map(|level| level > 0.0);
    let temperature = hvac
        .and_then(|zone| zone.temperature.as_ref())
        .and_then(|t| t.value.as_ref())
        .and_then(super::raw::RawTemperature::celsius);
    let defrost_on = body
        .and_then(|b| b.windshield.as_ref())
        .and_then(|w| w.front.as_ref())
        .and_then(|front| front.defog.as_ref())
        .and_then(|defog| number(defog.state))
        .map(|state| state > 0.0);

    let green = raw.green.as_ref();
    let charging_info = green.and_then(|g| g.charging_information.as_ref());
    let charger = charging_info.and_then(|info| {
        let plugin = info.connector_fastening.as_ref()?.state?.as_code();
        let charging = info
            .charging
            .as_ref()
            .and_then(|c| number(c.remain_time))
            .is_some_and(|minutes| minutes > 0.0);
        Some(ChargePhase::recode(plugin, charging))
    });

    let location = raw.location.as_ref();
    let coordinates = location
        .and_then(|l| l.geo_coord.as_ref())
        .and_then(|geo| Some(Coordinates::new(number(geo.latitude)?, number(geo.longitude)?)));

    let drivetrain = raw.drivetrain.as_ref();
    let fuel = drivetrain.and_then(|d| d.fuel_system.as_ref());

    let record = StatusRecord {
        observed_at: raw.date.clone(),
        odometer: drivetrain.and_then(|d| number(d.odometer)),
        coordinates,
        speed: location
            .and_then(|l| l.speed.as_ref())
            .and_then(|s| number(s.value)),
        locked,
        doors_closed: Some(doors_closed),
        windows_closed: Some(windows_closed),
        trunk_closed: Some(trunk_closed),
        hood_closed: Some(hood_closed),
        sunroof_closed: Some(sunroof_closed),
        closed_locked: Some(
            locked.unwrap_or(false)
                && doors_closed
                && windows_closed
                && trunk_closed
                && hood_closed
                && sunroof_closed,
        ),
        climate_on,
        defrost_on,
        engine_on: flag(raw.driving_ready),
        charger,
        ev_battery_level: green
            .and_then(|g| g.battery_management.as_ref())
            .and_then(|b| b.battery_remain.as_ref())
            .and_then(|r| number(r.ratio)),
        battery_12v_level: raw
            .electronics
            .as_ref()
            .and_then(|e| e.battery.as_ref())
            .and_then(|b| number(b.level)),
        range: fuel
            .and_then(|f| f.dte.as_ref())
            .and_then(|d| number(d.total)),
        fuel_level: fuel.and_then(|f| number(f.fuel_level)),
        tire_pressure_alarm: raw
            .chassis
            .as_ref()
            .and_then(|c| c.axle.as_ref())
            .and_then(|a| a.tire.as_ref())
            .and_then(|t| flag(t.pressure_low)),
        ..StatusRecord::default()
    };
    (record, temperature)
}
