//! Moving / parking / in-use classification of consecutive status records.

use crate::status::{ChargePhase, StatusRecord};
use std::time::Duration;
use tokio::time::Instant;

/// Per-axis displacement (degrees, ~11 m) that counts as movement between polls.
pub const MOVE_THRESHOLD_DEG: f64 = 0.0001;
/// Per-axis displacement (degrees, ~33 m) from the park location that counts
/// as a new parking spot.
pub const PARK_THRESHOLD_DEG: f64 = 0.0003;
/// How long the car counts as "just active" after qualifying activity.
pub const ACTIVE_WINDOW: Duration = Duration::from_secs(3 * 60);

/// True when the car moved since `previous`.
///
/// Without a previous position or a current speed reading nothing can be
/// said, so the answer is `false`.
pub fn is_moving(current: &StatusRecord, previous: &StatusRecord) -> bool {
    let Some(before) = previous.position() else {
        return false;
    };
    let Some(speed) = current.speed else {
        return false;
    };
    if speed > 0.0 {
        return true;
    }
    current
        .position()
        .is_some_and(|now| now.displaced_from(&before, MOVE_THRESHOLD_DEG))
}

/// True when the car stands still somewhere other than the stored park
/// location. An absent park location counts as "somewhere else".
pub fn is_parking(current: &StatusRecord, park_location: Option<&StatusRecord>) -> bool {
    if current.engine_on == Some(true) {
        return false;
    }
    let Some(now) = current.position() else {
        return false;
    };
    match park_location.and_then(StatusRecord::position) {
        Some(parked) => now.displaced_from(&parked, PARK_THRESHOLD_DEG),
        None => true,
    }
}

/// True when a human is plausibly using the car right now.
pub fn is_car_active(current: &StatusRecord, previous: &StatusRecord) -> bool {
    let on = |value: Option<bool>| value == Some(true);

    let stopped_charging = previous.charge_phase() == Some(ChargePhase::Charging)
        && current.charge_phase() == Some(ChargePhase::Unplugged);
    let unlocked = previous.locked == Some(true) && current.locked == Some(false);

    on(current.engine_on)
        || on(current.climate_on)
        || on(current.defrost_on)
        || stopped_charging
        || unlocked
}

/// Outcome of classifying one poll against its predecessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Activity {
    pub moving: bool,
    pub parking: bool,
    pub car_active: bool,
}

pub fn classify(
    current: &StatusRecord,
    previous: &StatusRecord,
    park_location: Option<&StatusRecord>,
) -> Activity {
    Activity {
        moving: is_moving(current, previous),
        parking: is_parking(current, park_location),
        car_active: is_car_active(current, previous),
    }
}

/// Remembers the last qualifying activity and answers "just active?".
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityWindow {
    last_active: Option<Instant>,
}

impl ActivityWindow {
    pub fn mark(&mut self, now: Instant) {
        self.last_active = Some(now);
    }

    /// When the window lapses, if it was ever opened.
    pub fn closes_at(&self) -> Option<Instant> {
        self.last_active.map(|at| at + ACTIVE_WINDOW)
    }

    pub fn is_open(&self, now: Instant) -> bool {
        self.last_active
            .is_some_and(|at| now.saturating_duration_since(at) < ACTIVE_WINDOW)
    }
}
