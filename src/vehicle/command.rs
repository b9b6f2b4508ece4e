use super::{ChargeTargets, ClimateSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of unit of work handled by the command queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Poll,
    StartClimate,
    StopClimate,
    Lock,
    Unlock,
    StartCharge,
    StopCharge,
    SetChargeTargets,
    SetNavigationDestination,
}

impl CommandKind {
    /// How long the car needs to physically react before the next command
    /// may safely follow.
    pub fn post_wait(self) -> Duration {
        let secs = match self {
            Self::Poll | Self::Lock | Self::Unlock | Self::StopCharge => 5,
            Self::StartClimate
            | Self::StopClimate
            | Self::StartCharge
            | Self::SetChargeTargets => 30,
            Self::SetNavigationDestination => 65,
        };
        Duration::from_secs(secs)
    }
}

/// A command submitted to the queue, with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Poll { force_once: bool },
    StartClimate(ClimateSettings),
    StopClimate,
    Lock,
    Unlock,
    StartCharge,
    StopCharge,
    SetChargeTargets(ChargeTargets),
    SetNavigationDestination { query: String },
}

impl Command {
    pub fn poll() -> Self {
        Self::Poll { force_once: false }
    }

    pub fn forced_poll() -> Self {
        Self::Poll { force_once: true }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Poll { .. } => CommandKind::Poll,
            Self::StartClimate(_) => CommandKind::StartClimate,
            Self::StopClimate => CommandKind::StopClimate,
            Self::Lock => CommandKind::Lock,
            Self::Unlock => CommandKind::Unlock,
            Self::StartCharge => CommandKind::StartCharge,
            Self::StopCharge => CommandKind::StopCharge,
            Self::SetChargeTargets(_) => CommandKind::SetChargeTargets,
            Self::SetNavigationDestination { .. } => CommandKind::SetNavigationDestination,
        }
    }

    pub fn is_poll(&self) -> bool {
        matches!(self, Self::Poll { .. })
    }
}
