use crate::scheduler::PollMode;
use crate::vehicle::CommandKind;
use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    CommandExecuted {
        device: String,
        kind: CommandKind,
        success: bool,
        duration: Duration,
    },
    PollSkipped {
        device: String,
        health: i32,
    },
    Restart {
        device: String,
        reason: String,
    },
    PollModeChanged {
        device: String,
        mode: PollMode,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverMetric {
    QueueDepth(u64),
    Watchdog(i32),
}

/// Sink for device events; implement for any backend
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
