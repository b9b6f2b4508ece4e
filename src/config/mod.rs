pub mod schema;

pub use schema::{
    AlarmConfig, Config, DistanceUnit, HomeConfig, LoggingConfig, ObservabilityConfig,
    MAX_QUEUE_CAPACITY, PollingConfig, QueueConfig, WatchdogConfig,
};
