//! Ordered, bounded, single-consumer execution pipeline for vehicle commands.
//!
//! At most one consumer task runs per queue. `enqueue` spawns it when none is
//! running; the consumer drains the queue one command at a time, pacing each
//! command by its post-wait, and exits once nothing is left. Every
//! user/automation command is followed by a confirmation poll unless a
//! stop-charge cooldown is in effect.

mod bounded;

pub use bounded::BoundedQueue;

use crate::config::QueueConfig;
use crate::error::VehicleError;
use crate::vehicle::{BoxFuture, Command, CommandKind};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::time::{self, Instant};

/// How a single dequeued command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Executed; `retried` when the first attempt hit a retry code.
    Succeeded { retried: bool },
    /// Failed with no (further) retry.
    Failed(VehicleError),
    /// Skipped because no vehicle session exists.
    SessionAbsent,
}

/// What the queue drives. Implemented by the device controller.
pub trait CommandHandler: Send + Sync {
    fn has_session(&self) -> bool;

    fn execute<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<(), VehicleError>>;

    fn reauthenticate(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    /// Called before each command is attempted.
    fn on_start(&self, command: &Command);

    /// Called once per dequeued command with its final outcome.
    fn on_outcome(&self, command: &Command, outcome: &CommandOutcome);

    /// Called when the consumer died unexpectedly.
    fn on_abort(&self) {}
}

struct Slots {
    pending: BoundedQueue<Command>,
    running: bool,
    enabled: bool,
    last_executed: Option<CommandKind>,
    stop_charge_at: Option<Instant>,
}

struct Shared {
    config: QueueConfig,
    handler: Weak<dyn CommandHandler>,
    slots: Mutex<Slots>,
}

/// Cheap-to-clone handle to one device's command queue.
#[derive(Clone)]
pub struct CommandQueue {
    shared: Arc<Shared>,
}

impl CommandQueue {
    /// New, disabled queue. Call [`CommandQueue::enable`] once the handler
    /// is ready.
    pub fn new(config: QueueConfig, handler: Weak<dyn CommandHandler>) -> Self {
        let slots = Slots {
            pending: BoundedQueue::new(config.capacity),
            running: false,
            enabled: false,
            last_executed: None,
            stop_charge_at: None,
        };
        Self {
            shared: Arc::new(Shared {
                config,
                handler,
                slots: Mutex::new(slots),
            }),
        }
    }

    /// Append `command`, starting the consumer if it is idle. Returns
    /// `false` when the command was dropped (queue disabled or full).
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, command: Command) -> bool {
        let kind = command.kind();
        let start_consumer = {
            let mut slots = self.shared.lock();
            if !slots.enabled {
                tracing::debug!(command = %kind, "command queue disabled, dropping command");
                return false;
            }
            if slots.pending.push(command).is_err() {
                tracing::warn!(
                    command = %kind,
                    capacity = slots.pending.capacity(),
                    "command queue full, dropping command"
                );
                return false;
            }
            tracing::debug!(command = %kind, depth = slots.pending.len(), "command queued");
            !std::mem::replace(&mut slots.running, true)
        };

        if start_consumer {
            self.spawn_consumer();
        }
        true
    }

    pub fn enable(&self) {
        self.shared.lock().enabled = true;
    }

    /// Stop accepting commands. A command already executing runs to
    /// completion.
    pub fn disable(&self) {
        self.shared.lock().enabled = false;
    }

    /// Drop every pending command; returns how many were discarded.
    pub fn flush(&self) -> usize {
        let dropped = self.shared.lock().pending.clear();
        if dropped > 0 {
            tracing::info!(dropped, "command queue flushed");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().enabled
    }

    /// Whether a consumer task is currently alive.
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn last_executed(&self) -> Option<CommandKind> {
        self.shared.lock().last_executed
    }

    fn spawn_consumer(&self) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let consumer = AssertUnwindSafe(Arc::clone(&shared).consume()).catch_unwind();
            if consumer.await.is_err() {
                tracing::error!("command consumer panicked; queue state reset");
                shared.lock().running = false;
                if let Some(handler) = shared.handler.upgrade() {
                    handler.on_abort();
                }
            }
        });
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn consume(self: Arc<Self>) {
        while let Some(command) = self.next_command() {
            let Some(handler) = self.handler.upgrade() else {
                tracing::debug!("command handler gone, stopping consumer");
                self.lock().running = false;
                return;
            };
            self.run(handler.as_ref(), &command).await;
        }
    }

    /// Pop the next command, or synthesize the confirmation poll once the
    /// queue has drained. Clears `running` when there is nothing left, under
    /// the same lock `enqueue` takes.
    fn next_command(&self) -> Option<Command> {
        let mut slots = self.lock();
        if let Some(command) = slots.pending.pop() {
            return Some(command);
        }
        if self.needs_follow_up(&slots, Instant::now()) {
            tracing::debug!("queue drained after a command, appending confirmation poll");
            // Recorded right away so the synthetic poll cannot chain itself.
            slots.last_executed = Some(CommandKind::Poll);
            return Some(Command::poll());
        }
        slots.running = false;
        None
    }

    fn needs_follow_up(&self, slots: &Slots, now: Instant) -> bool {
        let Some(last) = slots.last_executed else {
            return false;
        };
        if !slots.enabled || last == CommandKind::Poll {
            return false;
        }
        let cooldown = self.config.stop_charge_cooldown();
        let cooling_down = slots
            .stop_charge_at
            .is_some_and(|at| now.saturating_duration_since(at) < cooldown);
        !cooling_down
    }

    async fn run(&self, handler: &dyn CommandHandler, command: &Command) {
        let kind = command.kind();
        handler.on_start(command);

        if !handler.has_session() {
            // Nothing reached the car, so there is nothing to confirm.
            tracing::warn!(command = %kind, "no vehicle session, command skipped");
            handler.on_outcome(command, &CommandOutcome::SessionAbsent);
            return;
        }

        let outcome = match handler.execute(command).await {
            Ok(()) => CommandOutcome::Succeeded { retried: false },
            Err(error) if error.has_code(&self.config.retry_codes) => {
                self.retry(handler, command, &error).await
            }
            Err(error) => CommandOutcome::Failed(error),
        };

        if let CommandOutcome::Failed(error) = &outcome {
            tracing::warn!(command = %kind, %error, "command failed");
        }
        let succeeded = matches!(outcome, CommandOutcome::Succeeded { .. });
        self.record_executed(kind, succeeded);
        handler.on_outcome(command, &outcome);

        time::sleep(kind.post_wait()).await;
    }

    async fn retry(
        &self,
        handler: &dyn CommandHandler,
        command: &Command,
        error: &VehicleError,
    ) -> CommandOutcome {
        let delay = self.config.retry_delay();
        tracing::info!(
            command = %command.kind(),
            code = error.code().unwrap_or_default(),
            delay_secs = delay.as_secs(),
            "remote reported duplicate or rate-limited request, retrying once"
        );
        time::sleep(delay).await;

        if self.config.relogin_on_retry
            && let Err(error) = handler.reauthenticate().await
        {
            tracing::warn!(%error, "re-login before retry failed");
        }

        match handler.execute(command).await {
            Ok(()) => CommandOutcome::Succeeded { retried: true },
            Err(error) => CommandOutcome::Failed(error),
        }
    }

    fn record_executed(&self, kind: CommandKind, succeeded: bool) {
        let mut slots = self.lock();
        slots.last_executed = Some(kind);
        if kind == CommandKind::StopCharge && succeeded {
            slots.stop_charge_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests;
