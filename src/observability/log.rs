use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::info;

/// Observer that writes every event through `tracing`
#[derive(Debug, Default)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::CommandExecuted {
                device,
                kind,
                success,
                duration,
            } => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                info!(device = %device, command = %kind, success, duration_ms = ms, "command.executed");
            }
            ObserverEvent::PollSkipped { device, health } => {
                info!(device = %device, health, "poll.skipped");
            }
            ObserverEvent::Restart { device, reason } => {
                info!(device = %device, reason = %reason, "device.restart");
            }
            ObserverEvent::PollModeChanged { device, mode } => {
                info!(device = %device, mode = %mode, "poll.mode_changed");
            }
            ObserverEvent::Error { component, message } => {
                info!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::QueueDepth(depth) => {
                info!(depth, "metric.queue_depth");
            }
            ObserverMetric::Watchdog(value) => {
                info!(value, "metric.watchdog");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
