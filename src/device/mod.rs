//! Device lifecycle controller.
//!
//! One [`DeviceController`] per vehicle. It owns the watchdog and the
//! busy/restarting flags, drives the command queue and the poll scheduler,
//! and orders start-up, shutdown and restart across them.

pub mod capabilities;
mod poll;
mod state;

pub use state::{DeviceState, HEALTH_MAX};

use crate::config::Config;
use crate::diagnostics::health::{self, ComponentStatus};
use crate::error::{DriveError, VehicleError};
use crate::host::{
    CapabilityStore, KeyValueStore, LAST_STATUS_KEY, PARK_LOCATION_KEY, TriggerSink, load_record,
};
use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::queue::{CommandHandler, CommandOutcome, CommandQueue};
use crate::scheduler::{PollMode, PollScheduler, PollTarget};
use crate::status::StatusRecord;
use crate::vehicle::{BoxFuture, Command, CommandKind, Geocoder, VehicleClient};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// External collaborators a device talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub vehicle: Arc<dyn VehicleClient>,
    pub geocoder: Arc<dyn Geocoder>,
    pub capabilities: Arc<dyn CapabilityStore>,
    pub store: Arc<dyn KeyValueStore>,
    pub triggers: Arc<dyn TriggerSink>,
    pub observer: Arc<dyn Observer>,
}

pub struct DeviceController {
    name: String,
    config: Arc<Config>,
    collaborators: Collaborators,
    state: Mutex<DeviceState>,
    queue: CommandQueue,
    scheduler: PollScheduler,
    restart_task: Mutex<Option<JoinHandle<()>>>,
    deferred_poll: Mutex<Option<JoinHandle<()>>>,
    mode_timer: Mutex<Option<JoinHandle<()>>>,
    this: Weak<DeviceController>,
}

fn take_task(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn replace_task(slot: &Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
    let previous = slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(handle);
    if let Some(previous) = previous {
        previous.abort();
    }
}

impl DeviceController {
    pub fn new(config: Arc<Config>, collaborators: Collaborators) -> Arc<Self> {
        let name = config.device_name.clone();
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handler: Weak<dyn CommandHandler> = this.clone();
            let target: Weak<dyn PollTarget> = this.clone();
            Self {
                queue: CommandQueue::new(config.queue.clone(), handler),
                scheduler: PollScheduler::new(target),
                name,
                config,
                collaborators,
                state: Mutex::new(DeviceState::default()),
                restart_task: Mutex::new(None),
                deferred_poll: Mutex::new(None),
                mode_timer: Mutex::new(None),
                this: this.clone(),
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Copy of the controller's state.
    pub fn state(&self) -> DeviceState {
        self.lock_state().clone()
    }

    pub fn health(&self) -> i32 {
        self.lock_state().health()
    }

    pub fn poll_mode(&self) -> PollMode {
        self.lock_state().poll_mode()
    }

    pub fn is_restarting(&self) -> bool {
        self.lock_state().is_restarting()
    }

    pub fn last_status(&self) -> StatusRecord {
        self.lock_state().last_status().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn component(&self, kind: &str) -> String {
        health::component_key(kind, &self.name)
    }

    fn report_watchdog(&self, value: i32) {
        health::record_watchdog(&self.component("device"), value);
        self.collaborators
            .observer
            .record_metric(&ObserverMetric::Watchdog(value));
    }

    /// Mark `kind` failed in the health registry and tell the observer.
    fn report_error(&self, kind: &str, message: &str) {
        let component = self.component(kind);
        health::mark_component_error(&component, message);
        self.collaborators.observer.record_event(&ObserverEvent::Error {
            component,
            message: message.to_string(),
        });
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Restore persisted state, log in and begin polling.
    ///
    /// A failed login marks the device unavailable and schedules a restart,
    /// which keeps retrying start-up until it succeeds.
    pub async fn start(&self) -> Result<(), DriveError> {
        let device_key = self.component("device");
        health::mark_component_status(&device_key, ComponentStatus::Starting);
        tracing::info!(device = %self.name, "starting device");

        self.restore_state();

        if let Err(error) = self.collaborators.vehicle.login().await {
            tracing::warn!(device = %self.name, %error, "vehicle login failed");
            let reason = error.to_string();
            self.report_error("device", &reason);
            self.lock_state().mark_unavailable();
            self.collaborators
                .capabilities
                .set_available(false, Some(&reason));
            self.restart(&reason);
            return Err(error.into());
        }

        self.lock_state().mark_started();
        self.report_watchdog(HEALTH_MAX);
        self.collaborators.capabilities.set_available(true, None);
        self.queue.enable();
        self.start_polling(PollMode::Normal);
        self.queue.enqueue(Command::forced_poll());

        health::mark_component_ok(&device_key);
        health::mark_component_ok(&self.component("queue"));
        tracing::info!(device = %self.name, "device started");
        Ok(())
    }

    /// Cancel polling and drop pending commands. Safe to call repeatedly.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.queue.disable();
        self.queue.flush();
        for slot in [&self.restart_task, &self.deferred_poll, &self.mode_timer] {
            if let Some(handle) = take_task(slot) {
                handle.abort();
            }
        }
        self.lock_state().finish_restart();
        health::mark_component_status(&self.component("device"), ComponentStatus::Stopped);
        health::mark_component_status(&self.component("scheduler"), ComponentStatus::Stopped);
        self.collaborators.observer.flush();
        tracing::info!(device = %self.name, "device stopped");
    }

    /// Tear the device down and re-run start-up after the watchdog delay.
    ///
    /// At most one restart runs at a time; calls made while one is under
    /// way are ignored. A command already executing is not aborted.
    pub fn restart(&self, reason: &str) {
        if !self.lock_state().begin_restart() {
            tracing::debug!(device = %self.name, reason, "restart already in progress");
            return;
        }
        tracing::error!(device = %self.name, reason, "restarting device");
        self.collaborators.observer.record_event(&ObserverEvent::Restart {
            device: self.name.clone(),
            reason: reason.to_string(),
        });
        health::bump_component_restart(&self.component("device"));

        self.scheduler.stop();
        self.queue.disable();
        self.queue.flush();
        for slot in [&self.deferred_poll, &self.mode_timer] {
            if let Some(handle) = take_task(slot) {
                handle.abort();
            }
        }
        self.collaborators
            .capabilities
            .set_available(false, Some(reason));

        let delay = self.config.watchdog.restart_delay();
        let this = self.this.clone();
        let device = self.name.clone();
        let handle = tokio::spawn(async move {
            loop {
                time::sleep(delay).await;
                let Some(controller) = this.upgrade() else {
                    return;
                };
                match controller.start().await {
                    Ok(()) => {
                        controller.lock_state().finish_restart();
                        tracing::info!(device = %device, "device restarted");
                        return;
                    }
                    Err(error) => {
                        tracing::warn!(
                            device = %device,
                            %error,
                            retry_secs = delay.as_secs(),
                            "start-up after restart failed, retrying"
                        );
                    }
                }
            }
        });
        replace_task(&self.restart_task, handle);
    }

    /// Submit a user or automation command.
    pub fn send(&self, command: Command) -> bool {
        let accepted = self.queue.enqueue(command);
        self.collaborators
            .observer
            .record_metric(&ObserverMetric::QueueDepth(self.queue.len() as u64));
        accepted
    }

    fn restore_state(&self) {
        let store = self.collaborators.store.as_ref();
        let load = |key: &str| match load_record(store, key) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(device = %self.name, %error, "ignoring persisted state");
                None
            }
        };
        let last_status = load(LAST_STATUS_KEY);
        let park_location = load(PARK_LOCATION_KEY);
        self.lock_state().restore(last_status, park_location);
    }

    fn start_polling(&self, mode: PollMode) {
        let interval = match mode {
            PollMode::Normal => self.config.polling.normal_interval(),
            PollMode::Active => self.config.polling.active_interval(),
        };
        self.scheduler.start(interval, mode);
        health::mark_component_ok(&self.component("scheduler"));
    }

    /// Switch the scheduler to `mode`, unless a restart owns it right now.
    fn switch_poll_mode(&self, mode: PollMode) {
        if self.is_restarting() {
            return;
        }
        tracing::info!(device = %self.name, mode = %mode, "poll mode changed");
        self.collaborators
            .observer
            .record_event(&ObserverEvent::PollModeChanged {
                device: self.name.clone(),
                mode,
            });
        self.start_polling(mode);
    }

    /// Drop back to normal polling when the activity window lapses, even
    /// if no poll succeeds in the meantime. Re-armed on every poll that
    /// keeps the device active.
    fn arm_mode_timer(&self) {
        let Some(deadline) = self.lock_state().active_until() else {
            return;
        };
        let this = self.this.clone();
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let Some(controller) = this.upgrade() else {
                return;
            };
            let change = controller
                .lock_state()
                .observe_activity(false, Instant::now());
            if let Some(mode) = change {
                controller.switch_poll_mode(mode);
            }
        });
        replace_task(&self.mode_timer, handle);
    }

    /// One confirmation poll once the stop-charge cooldown has passed.
    fn schedule_deferred_poll(&self) {
        let cooldown = self.config.queue.stop_charge_cooldown();
        let queue = self.queue.clone();
        let handle = tokio::spawn(async move {
            time::sleep(cooldown).await;
            queue.enqueue(Command::poll());
        });
        replace_task(&self.deferred_poll, handle);
    }

    async fn run_command(&self, command: &Command) -> Result<(), VehicleError> {
        let vehicle = self.collaborators.vehicle.as_ref();
        match command {
            Command::Poll { force_once } => self.poll(*force_once).await,
            Command::StartClimate(settings) => vehicle.start_climate(settings).await,
            Command::StopClimate => vehicle.stop_climate().await,
            Command::Lock => vehicle.lock().await,
            Command::Unlock => vehicle.unlock().await,
            Command::StartCharge => vehicle.start_charge().await,
            Command::StopCharge => vehicle.stop_charge().await,
            Command::SetChargeTargets(targets) => vehicle.set_charge_targets(targets).await,
            Command::SetNavigationDestination { query } => {
                let place = self
                    .collaborators
                    .geocoder
                    .search(query)
                    .await
                    .map_err(|error| {
                        VehicleError::Other(format!("destination lookup failed: {error}"))
                    })?;
                tracing::debug!(device = %self.name, destination = %place.display_name, "destination resolved");
                vehicle.set_navigation(&place).await
            }
        }
    }
}

impl CommandHandler for DeviceController {
    fn has_session(&self) -> bool {
        self.collaborators.vehicle.has_session()
    }

    fn execute<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<(), VehicleError>> {
        Box::pin(self.run_command(command))
    }

    fn reauthenticate(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.collaborators.vehicle.login()
    }

    fn on_start(&self, _command: &Command) {
        self.lock_state().begin_command(Instant::now());
    }

    fn on_outcome(&self, command: &Command, outcome: &CommandOutcome) {
        let kind = command.kind();
        let (health_value, elapsed, restarting) = {
            let mut state = self.lock_state();
            match outcome {
                CommandOutcome::Succeeded { .. } => state.record_success(),
                CommandOutcome::Failed(_) => state.record_failure(),
                CommandOutcome::SessionAbsent => state.record_session_absent(),
            }
            (
                state.health(),
                state.command_elapsed(Instant::now()),
                state.is_restarting(),
            )
        };
        self.report_watchdog(health_value);

        let success = matches!(outcome, CommandOutcome::Succeeded { .. });
        match outcome {
            CommandOutcome::Succeeded { .. } if restarting => {
                tracing::debug!(device = %self.name, command = %kind, "command finished during restart");
            }
            CommandOutcome::Succeeded { .. } => {
                self.collaborators.capabilities.set_available(true, None);
                health::mark_component_ok(&self.component("device"));
            }
            CommandOutcome::Failed(error) => {
                tracing::warn!(device = %self.name, command = %kind, health = health_value, %error, "command not recovered");
                self.report_error("device", &error.to_string());
            }
            CommandOutcome::SessionAbsent => {
                tracing::warn!(device = %self.name, command = %kind, health = health_value, "command skipped without session");
                self.report_error("device", &VehicleError::NoSession.to_string());
            }
        }

        self.collaborators
            .observer
            .record_event(&ObserverEvent::CommandExecuted {
                device: self.name.clone(),
                kind,
                success,
                duration: elapsed,
            });

        if kind == CommandKind::StopCharge && success && !restarting {
            self.schedule_deferred_poll();
        }
    }

    fn on_abort(&self) {
        self.lock_state().abort_command();
        self.report_error("queue", "command consumer panicked");
    }
}

impl PollTarget for DeviceController {
    fn health(&self) -> i32 {
        DeviceController::health(self)
    }

    fn is_busy(&self) -> bool {
        self.lock_state().is_busy()
    }

    fn record_skipped_poll(&self) {
        let value = {
            let mut state = self.lock_state();
            state.record_skipped_poll();
            state.health()
        };
        self.report_watchdog(value);
        self.collaborators
            .observer
            .record_event(&ObserverEvent::PollSkipped {
                device: self.name.clone(),
                health: value,
            });
    }

    fn enqueue_poll(&self) {
        self.queue.enqueue(Command::poll());
    }

    fn request_restart(&self, reason: &str) {
        self.restart(reason);
    }
}

impl Drop for DeviceController {
    fn drop(&mut self) {
        for slot in [&self.restart_task, &self.deferred_poll, &self.mode_timer] {
            if let Some(handle) = take_task(slot) {
                handle.abort();
            }
        }
    }
}

