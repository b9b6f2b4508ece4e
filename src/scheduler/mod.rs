//! Timer-driven producer of `poll` commands.
//!
//! One periodic task per device. `start` replaces any running task, so a
//! Poll Mode change is just another `start` with the new interval.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Polling cadence.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollMode {
    #[default]
    Normal,
    /// Shorter interval while the car is in use.
    Active,
}

/// What a scheduler tick acts on. Implemented by the device controller.
pub trait PollTarget: Send + Sync {
    /// Current watchdog value.
    fn health(&self) -> i32;

    /// Whether the queue consumer is executing a command right now.
    fn is_busy(&self) -> bool;

    fn record_skipped_poll(&self);

    fn enqueue_poll(&self);

    /// Watchdog exhausted. Called at most once per scheduler run, after
    /// which the loop ends.
    fn request_restart(&self, reason: &str);
}

/// What a single tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Polled,
    Skipped,
    Restart,
}

/// Run one tick against `target`.
pub fn tick(target: &dyn PollTarget) -> TickAction {
    let health = target.health();
    if health <= 0 {
        tracing::error!(health, "watchdog exhausted, restarting device");
        target.request_restart("watchdog exhausted");
        return TickAction::Restart;
    }
    if target.is_busy() {
        target.record_skipped_poll();
        tracing::warn!(
            health = target.health(),
            "command consumer busy, skipping scheduled poll"
        );
        return TickAction::Skipped;
    }
    target.enqueue_poll();
    TickAction::Polled
}

pub struct PollScheduler {
    target: Weak<dyn PollTarget>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(target: Weak<dyn PollTarget>) -> Self {
        Self {
            target,
            task: Mutex::new(None),
        }
    }

    /// Cancel any running timer and arm a new one firing every `interval`.
    /// The first tick fires one full interval from now.
    pub fn start(&self, interval: Duration, mode: PollMode) {
        let period = interval.max(Duration::from_secs(1));
        tracing::info!(
            mode = %mode,
            interval_secs = period.as_secs(),
            "polling scheduler started"
        );

        let target = self.target.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                if tick(target.as_ref()) == TickAction::Restart {
                    break;
                }
            }
        });

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel the timer. Safe to call when nothing is running.
    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("polling scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
