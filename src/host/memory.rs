use super::{CapabilityStore, KeyValueStore, Trigger, TriggerSink};
use crate::error::StoreError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    declared: Option<BTreeSet<String>>,
    capabilities: BTreeMap<String, Value>,
    settings: BTreeMap<String, Value>,
    available: bool,
    unavailable_reason: Option<String>,
    fired: Vec<(Trigger, Map<String, Value>)>,
}

/// In-process host, used by the CLI and tests.
///
/// Without declared capabilities every capability counts as present.
#[derive(Default)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that only carries the named capabilities.
    pub fn with_capabilities<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host = Self::default();
        host.lock().declared = Some(names.into_iter().map(Into::into).collect());
        host
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        self.lock().unavailable_reason.clone()
    }

    pub fn capabilities(&self) -> BTreeMap<String, Value> {
        self.lock().capabilities.clone()
    }

    pub fn fired(&self) -> Vec<(Trigger, Map<String, Value>)> {
        self.lock().fired.clone()
    }

    pub fn fired_count(&self, trigger: Trigger) -> usize {
        self.lock().fired.iter().filter(|(t, _)| *t == trigger).count()
    }
}

impl CapabilityStore for MemoryHost {
    fn has_capability(&self, name: &str) -> bool {
        self.lock()
            .declared
            .as_ref()
            .is_none_or(|declared| declared.contains(name))
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.lock().capabilities.get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.lock().capabilities.insert(name.to_string(), value);
    }

    fn set_available(&self, available: bool, reason: Option<&str>) {
        let mut inner = self.lock();
        inner.available = available;
        inner.unavailable_reason = if available {
            None
        } else {
            reason.map(str::to_string)
        };
    }
}

impl KeyValueStore for MemoryHost {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().settings.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.lock().settings.insert(key.to_string(), value);
        Ok(())
    }
}

impl TriggerSink for MemoryHost {
    fn fire(&self, trigger: Trigger, tokens: &Map<String, Value>) {
        self.lock().fired.push((trigger, tokens.clone()));
    }
}
