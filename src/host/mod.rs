//! Host-side collaborators: the hub's capability registry, its persisted
//! settings and its trigger sink.
//!
//! All three are synchronous; a host whose API is asynchronous buffers
//! writes on its side.

mod memory;

pub use memory::MemoryHost;

use crate::error::StoreError;
use crate::status::StatusRecord;
use serde_json::{Map, Value};

/// Persisted key holding the last canonical record.
pub const LAST_STATUS_KEY: &str = "lastStatus";
/// Persisted key holding the record taken when the car last parked.
pub const PARK_LOCATION_KEY: &str = "parkLocation";

/// The device's capability values as the hub shows them.
pub trait CapabilityStore: Send + Sync {
    fn has_capability(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Option<Value>;

    fn set(&self, name: &str, value: Value);

    /// Mark the device (un)available; `reason` is shown when unavailable.
    fn set_available(&self, available: bool, reason: Option<&str>);
}

/// Opaque per-device key/value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Flow triggers fired towards the hub's automation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Trigger {
    HasMoved,
    HasParked,
    StatusUpdate,
}

pub trait TriggerSink: Send + Sync {
    fn fire(&self, trigger: Trigger, tokens: &Map<String, Value>);
}

/// Read a persisted record. An absent key is `Ok(None)`.
pub fn load_record(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<StatusRecord>, StoreError> {
    let Some(value) = store.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })
}

pub fn save_record(
    store: &dyn KeyValueStore,
    key: &str,
    record: &StatusRecord,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(record).map_err(|error| StoreError::Write {
        key: key.to_string(),
        message: error.to_string(),
    })?;
    store.set(key, value)
}
