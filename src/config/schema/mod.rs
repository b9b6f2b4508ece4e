mod core;
mod home;
mod observability;
mod polling;
mod queue;

pub use core::{Config, LoggingConfig};
pub use home::{AlarmConfig, DistanceUnit, HomeConfig};
pub use observability::ObservabilityConfig;
pub use polling::PollingConfig;
pub use queue::{MAX_QUEUE_CAPACITY, QueueConfig, WatchdogConfig};
