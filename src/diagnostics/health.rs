//! Process-wide component health registry.
//!
//! Components are keyed by name: `device:<name>`, `queue:<name>` and
//! `scheduler:<name>` for each vehicle, so several devices never collide.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentStatus {
    Starting,
    Ok,
    Error,
    Restarting,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
    /// Latest watchdog value, for components that have one.
    pub watchdog: Option<i32>,
}

impl ComponentHealth {
    fn registered(at: String) -> Self {
        Self {
            status: ComponentStatus::Starting,
            updated_at: at,
            last_ok: None,
            last_error: None,
            restart_count: 0,
            watchdog: None,
        }
    }
}

/// Point-in-time copy of every registered component.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub pid: u32,
    pub taken_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

struct Registry {
    booted: Instant,
    entries: RwLock<BTreeMap<String, ComponentHealth>>,
}

impl Registry {
    fn global() -> &'static Self {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| Registry {
            booted: Instant::now(),
            entries: RwLock::new(BTreeMap::new()),
        })
    }

    /// Apply `change` to `name`, registering it first if unseen. A poisoned
    /// lock drops the update.
    fn update(&self, name: &str, change: impl FnOnce(&mut ComponentHealth)) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let stamp = Utc::now().to_rfc3339();
        let entry = entries
            .entry(name.to_owned())
            .or_insert_with(|| ComponentHealth::registered(stamp.clone()));
        change(entry);
        entry.updated_at = stamp;
    }

    fn entries(&self) -> BTreeMap<String, ComponentHealth> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

/// Registry key for one of a device's components.
pub fn component_key(kind: &str, device: &str) -> String {
    format!("{kind}:{device}")
}

pub fn mark_component_status(component: &str, status: ComponentStatus) {
    Registry::global().update(component, |entry| entry.status = status);
}

pub fn mark_component_ok(component: &str) {
    Registry::global().update(component, |entry| {
        entry.status = ComponentStatus::Ok;
        entry.last_ok = Some(Utc::now().to_rfc3339());
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let message = error.to_string();
    Registry::global().update(component, move |entry| {
        entry.status = ComponentStatus::Error;
        entry.last_error = Some(message);
    });
}

/// Count a restart and flag the component as restarting.
pub fn bump_component_restart(component: &str) {
    Registry::global().update(component, |entry| {
        entry.status = ComponentStatus::Restarting;
        entry.restart_count += 1;
    });
}

pub fn record_watchdog(component: &str, value: i32) {
    Registry::global().update(component, |entry| entry.watchdog = Some(value));
}

pub fn component(component: &str) -> Option<ComponentHealth> {
    let entries = Registry::global().entries.read().ok()?;
    entries.get(component).cloned()
}

pub fn snapshot() -> HealthSnapshot {
    let registry = Registry::global();
    HealthSnapshot {
        pid: std::process::id(),
        taken_at: Utc::now().to_rfc3339(),
        uptime_seconds: registry.booted.elapsed().as_secs(),
        components: registry.entries(),
    }
}

pub fn snapshot_json() -> serde_json::Value {
    match serde_json::to_value(snapshot()) {
        Ok(value) => value,
        Err(error) => serde_json::json!({ "error": error.to_string() }),
    }
}
