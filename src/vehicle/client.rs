use super::PlaceDetails;
use crate::error::VehicleError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Position report from the dedicated location endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSettings {
    /// Cabin target in degrees Celsius.
    pub temperature: f64,
    #[serde(default)]
    pub defrost: bool,
    /// Steering wheel / rear window heating.
    #[serde(default)]
    pub heating: bool,
    #[serde(default = "default_climate_minutes")]
    pub duration_minutes: u32,
}

fn default_climate_minutes() -> u32 {
    10
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            temperature: 21.0,
            defrost: false,
            heating: false,
            duration_minutes: default_climate_minutes(),
        }
    }
}

/// Charge limits in percent for DC (fast) and AC (slow) charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeTargets {
    pub fast_percent: u8,
    pub slow_percent: u8,
}

/// Authenticated session against the vehicle cloud.
///
/// Implementations own authentication, token refresh and transport. Every
/// remote call reports failures as [`VehicleError`], with the cloud's result
/// code preserved in [`VehicleError::Remote`].
pub trait VehicleClient: Send + Sync {
    /// Whether a usable session currently exists.
    fn has_session(&self) -> bool;

    fn login(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    /// Status in the legacy shape. `refresh` asks the car rather than the
    /// cloud cache; `parsed` selects the client's own pre-parsed form.
    fn status(
        &self,
        refresh: bool,
        parsed: bool,
    ) -> BoxFuture<'_, Result<serde_json::Value, VehicleError>>;

    /// Combined status + location + odometer. `Ok(None)` when the vehicle
    /// does not offer the combined endpoint.
    fn full_status(
        &self,
        refresh: bool,
    ) -> BoxFuture<'_, Result<Option<serde_json::Value>, VehicleError>>;

    fn location(&self) -> BoxFuture<'_, Result<Location, VehicleError>>;

    fn odometer(&self) -> BoxFuture<'_, Result<f64, VehicleError>>;

    fn start_climate<'a>(
        &'a self,
        settings: &'a ClimateSettings,
    ) -> BoxFuture<'a, Result<(), VehicleError>>;

    fn stop_climate(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    fn lock(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    fn unlock(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    fn start_charge(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    fn stop_charge(&self) -> BoxFuture<'_, Result<(), VehicleError>>;

    fn set_charge_targets<'a>(
        &'a self,
        targets: &'a ChargeTargets,
    ) -> BoxFuture<'a, Result<(), VehicleError>>;

    fn set_navigation<'a>(
        &'a self,
        destination: &'a PlaceDetails,
    ) -> BoxFuture<'a, Result<(), VehicleError>>;
}
