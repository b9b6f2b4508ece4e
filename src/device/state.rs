use crate::activity::ActivityWindow;
use crate::scheduler::PollMode;
use crate::status::StatusRecord;
use std::time::Duration;
use tokio::time::Instant;

/// Watchdog ceiling; also the value it resets to on any success.
pub const HEALTH_MAX: i32 = 6;

/// Everything the lifecycle controller tracks for one device.
///
/// Mutated only through the named transitions below.
#[derive(Debug, Clone)]
pub struct DeviceState {
    health: i32,
    busy: bool,
    restarting: bool,
    available: bool,
    poll_mode: PollMode,
    activity: ActivityWindow,
    last_status: StatusRecord,
    park_location: Option<StatusRecord>,
    last_refresh: Option<Instant>,
    command_started: Option<Instant>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            health: HEALTH_MAX,
            busy: false,
            restarting: false,
            available: false,
            poll_mode: PollMode::Normal,
            activity: ActivityWindow::default(),
            last_status: StatusRecord::default(),
            park_location: None,
            last_refresh: None,
            command_started: None,
        }
    }
}

impl DeviceState {
    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_restarting(&self) -> bool {
        self.restarting
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn poll_mode(&self) -> PollMode {
        self.poll_mode
    }

    pub fn last_status(&self) -> &StatusRecord {
        &self.last_status
    }

    pub fn park_location(&self) -> Option<&StatusRecord> {
        self.park_location.as_ref()
    }

    // ── Command outcomes ────────────────────────────────────────────────

    /// Consumer picked up a command.
    pub fn begin_command(&mut self, now: Instant) {
        self.busy = true;
        self.command_started = Some(now);
    }

    /// Time since the current command started.
    pub fn command_elapsed(&self, now: Instant) -> Duration {
        self.command_started
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    /// A command reached the car. A command left over from before a
    /// restart does not make the device available again; start-up does.
    pub fn record_success(&mut self) {
        self.health = HEALTH_MAX;
        self.available = !self.restarting;
        self.busy = false;
    }

    pub fn record_failure(&mut self) {
        self.health -= 1;
        self.busy = false;
    }

    pub fn record_session_absent(&mut self) {
        self.health -= 2;
        self.busy = false;
    }

    pub fn record_skipped_poll(&mut self) {
        self.health -= 1;
    }

    /// Consumer died mid-command.
    pub fn abort_command(&mut self) {
        self.busy = false;
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Successful login: full health, available again.
    pub fn mark_started(&mut self) {
        self.health = HEALTH_MAX;
        self.available = true;
        self.busy = false;
        self.poll_mode = PollMode::Normal;
    }

    pub fn mark_unavailable(&mut self) {
        self.available = false;
    }

    /// Returns `false` when a restart is already under way.
    pub fn begin_restart(&mut self) -> bool {
        if self.restarting {
            return false;
        }
        self.restarting = true;
        self.available = false;
        self.busy = false;
        true
    }

    pub fn finish_restart(&mut self) {
        self.restarting = false;
    }

    pub fn restore(&mut self, last_status: Option<StatusRecord>, park_location: Option<StatusRecord>) {
        if let Some(record) = last_status {
            self.last_status = record;
        }
        if park_location.is_some() {
            self.park_location = park_location;
        }
    }

    // ── Polling ─────────────────────────────────────────────────────────

    /// Whether this poll should ask the car instead of the cloud cache.
    pub fn should_refresh(
        &self,
        force_once: bool,
        interval: Option<Duration>,
        now: Instant,
    ) -> bool {
        force_once
            || interval.is_some_and(|every| {
                self.last_refresh
                    .is_none_or(|at| now.saturating_duration_since(at) >= every)
            })
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = Some(now);
    }

    pub fn set_last_status(&mut self, record: StatusRecord) {
        self.last_status = record;
    }

    pub fn set_park_location(&mut self, record: StatusRecord) {
        self.park_location = Some(record);
    }

    /// Deadline at which active polling should end, while it is on.
    pub fn active_until(&self) -> Option<Instant> {
        match self.poll_mode {
            PollMode::Active => self.activity.closes_at(),
            PollMode::Normal => None,
        }
    }

    /// Feed one poll's car-active verdict. Returns the new mode when it
    /// changed.
    pub fn observe_activity(&mut self, car_active: bool, now: Instant) -> Option<PollMode> {
        if car_active {
            self.activity.mark(now);
        }
        let wanted = if self.activity.is_open(now) {
            PollMode::Active
        } else {
            PollMode::Normal
        };
        if wanted == self.poll_mode {
            return None;
        }
        self.poll_mode = wanted;
        Some(wanted)
    }
}
