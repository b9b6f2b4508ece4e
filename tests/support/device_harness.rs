#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use drivelink::config::Config;
use drivelink::device::{Collaborators, DeviceController};
use drivelink::error::{GeocodeError, VehicleError};
use drivelink::host::MemoryHost;
use drivelink::observability::{Observer, ObserverEvent, ObserverMetric};
use drivelink::status::Coordinates;
use drivelink::vehicle::{
    BoxFuture, ChargeTargets, ClimateSettings, Geocoder, Location, PlaceDetails, ResolvedPlace,
    VehicleClient,
};

pub const HOME: (f64, f64) = (52.0907, 5.1214);

/// Scriptable vehicle cloud session.
#[derive(Default)]
pub struct FakeVehicle {
    session: AtomicBool,
    /// Session never survives login, so every command sees none.
    pub session_broken: AtomicBool,
    /// Number of upcoming logins that fail.
    pub login_failures: AtomicUsize,
    pub logins: AtomicUsize,
    /// Offer the combined status endpoint.
    pub combined: AtomicBool,
    pub payload: Mutex<Value>,
    pub location: Mutex<Option<Location>>,
    pub odometer: Mutex<Option<f64>>,
    /// Errors handed out, in order, to remote commands and status reads.
    pub errors: Mutex<VecDeque<VehicleError>>,
    pub calls: Mutex<Vec<String>>,
    pub refreshes: Mutex<Vec<bool>>,
    pub destination: Mutex<Option<PlaceDetails>>,
    /// How long each remote command takes.
    pub command_latency: Mutex<Duration>,
}

impl FakeVehicle {
    /// Vehicle offering `full_status` with `payload`.
    pub fn combined(payload: Value) -> Self {
        let vehicle = Self::default();
        vehicle.combined.store(true, Ordering::SeqCst);
        *vehicle.payload.lock().unwrap() = payload;
        vehicle
    }

    /// Vehicle with only the legacy status, location and odometer calls.
    pub fn legacy(payload: Value, location: Location, odometer: f64) -> Self {
        let vehicle = Self::default();
        *vehicle.payload.lock().unwrap() = payload;
        *vehicle.location.lock().unwrap() = Some(location);
        *vehicle.odometer.lock().unwrap() = Some(odometer);
        vehicle
    }

    pub fn set_payload(&self, payload: Value) {
        *self.payload.lock().unwrap() = payload;
    }

    pub fn fail_next(&self, error: VehicleError) {
        self.errors.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn refreshes(&self) -> Vec<bool> {
        self.refreshes.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), VehicleError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.errors.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn command(&self, call: &'static str) -> BoxFuture<'_, Result<(), VehicleError>> {
        Box::pin(async move {
            let latency = *self.command_latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.record(call)
        })
    }
}

impl VehicleClient for FakeVehicle {
    fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst) && !self.session_broken.load(Ordering::SeqCst)
    }

    fn login(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        Box::pin(async move {
            self.logins.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .login_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                self.session.store(false, Ordering::SeqCst);
                return Err(VehicleError::Login("bad credentials".into()));
            }
            self.session.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn status(&self, refresh: bool, _parsed: bool) -> BoxFuture<'_, Result<Value, VehicleError>> {
        Box::pin(async move {
            self.refreshes.lock().unwrap().push(refresh);
            self.record("status")?;
            Ok(self.payload.lock().unwrap().clone())
        })
    }

    fn full_status(&self, refresh: bool) -> BoxFuture<'_, Result<Option<Value>, VehicleError>> {
        Box::pin(async move {
            if !self.combined.load(Ordering::SeqCst) {
                return Ok(None);
            }
            self.refreshes.lock().unwrap().push(refresh);
            self.record("full_status")?;
            Ok(Some(self.payload.lock().unwrap().clone()))
        })
    }

    fn location(&self) -> BoxFuture<'_, Result<Location, VehicleError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("location".into());
            (*self.location.lock().unwrap())
                .ok_or_else(|| VehicleError::Unsupported("location".into()))
        })
    }

    fn odometer(&self) -> BoxFuture<'_, Result<f64, VehicleError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("odometer".into());
            (*self.odometer.lock().unwrap())
                .ok_or_else(|| VehicleError::Unsupported("odometer".into()))
        })
    }

    fn start_climate<'a>(
        &'a self,
        _settings: &'a ClimateSettings,
    ) -> BoxFuture<'a, Result<(), VehicleError>> {
        self.command("start_climate")
    }

    fn stop_climate(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.command("stop_climate")
    }

    fn lock(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.command("lock")
    }

    fn unlock(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.command("unlock")
    }

    fn start_charge(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.command("start_charge")
    }

    fn stop_charge(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        self.command("stop_charge")
    }

    fn set_charge_targets<'a>(
        &'a self,
        _targets: &'a ChargeTargets,
    ) -> BoxFuture<'a, Result<(), VehicleError>> {
        self.command("set_charge_targets")
    }

    fn set_navigation<'a>(
        &'a self,
        destination: &'a PlaceDetails,
    ) -> BoxFuture<'a, Result<(), VehicleError>> {
        Box::pin(async move {
            self.record("set_navigation")?;
            *self.destination.lock().unwrap() = Some(destination.clone());
            Ok(())
        })
    }
}

/// Resolves every position to the same street and knows one destination.
pub struct FakeGeocoder;

impl Geocoder for FakeGeocoder {
    fn resolve(
        &self,
        _coordinates: Coordinates,
    ) -> BoxFuture<'_, Result<ResolvedPlace, GeocodeError>> {
        Box::pin(async {
            Ok(ResolvedPlace {
                display_location: "Oudegracht, Utrecht".into(),
                address: "Oudegracht 1, 3511 AA Utrecht".into(),
            })
        })
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<PlaceDetails, GeocodeError>> {
        Box::pin(async move {
            if query != "central station" {
                return Err(GeocodeError::NotFound(query.to_string()));
            }
            Ok(PlaceDetails {
                latitude: 52.0894,
                longitude: 5.1100,
                display_name: "Utrecht Centraal".into(),
                postcode: Some("3511 CE".into()),
                phone: None,
                name: "Utrecht Centraal".into(),
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
    pub flushes: AtomicUsize,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Restart { .. }))
            .count()
    }

    /// `(component, message)` of every reported error.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Error { component, message } => Some((component, message)),
                _ => None,
            })
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn record_event(&self, event: &ObserverEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_metric(&self, _metric: &ObserverMetric) {}

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct Harness {
    pub device: Arc<DeviceController>,
    pub vehicle: Arc<FakeVehicle>,
    pub host: Arc<MemoryHost>,
    pub observer: Arc<RecordingObserver>,
}

static DEVICE_SEQ: AtomicUsize = AtomicUsize::new(0);

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.home.latitude = HOME.0;
    config.home.longitude = HOME.1;
    // Health registry is process-wide; keep each test's device apart.
    config.device_name = format!("test-car-{}", DEVICE_SEQ.fetch_add(1, Ordering::SeqCst));
    config
}

pub fn harness(vehicle: FakeVehicle) -> Harness {
    harness_with(test_config(), vehicle, MemoryHost::new())
}

pub fn harness_with(config: Config, vehicle: FakeVehicle, host: MemoryHost) -> Harness {
    let vehicle = Arc::new(vehicle);
    let host = Arc::new(host);
    let observer = Arc::new(RecordingObserver::default());
    let collaborators = Collaborators {
        vehicle: vehicle.clone(),
        geocoder: Arc::new(FakeGeocoder),
        capabilities: host.clone(),
        store: host.clone(),
        triggers: host.clone(),
        observer: observer.clone(),
    };
    let device = DeviceController::new(Arc::new(config), collaborators);
    Harness {
        device,
        vehicle,
        host,
        observer,
    }
}

/// Let every timer due within `secs` fire (paused clock).
pub async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Legacy combined payload at the given position.
pub fn legacy_full(latitude: f64, longitude: f64, speed: f64, engine: bool) -> Value {
    json!({
        "vehicleStatus": legacy_status(engine),
        "vehicleLocation": {
            "coord": { "lat": latitude, "lon": longitude },
            "speed": { "value": speed }
        },
        "odometer": { "value": 20_500.0 }
    })
}

pub fn legacy_status(engine: bool) -> Value {
    json!({
        "time": "20261018093000",
        "doorLock": !engine,
        "doorOpen": { "frontLeft": 0, "frontRight": 0, "backLeft": 0, "backRight": 0 },
        "trunkOpen": false,
        "hoodOpen": false,
        "airCtrlOn": false,
        "defrost": false,
        "airTemp": { "value": "OFF" },
        "engine": engine,
        "evStatus": { "batteryCharge": false, "batteryStatus": 72, "batteryPlugin": 0 },
        "battery": { "batSoc": 90 },
        "dte": { "value": 280 }
    })
}
