#[path = "support/device_harness.rs"]
mod device_harness;

use device_harness::{FakeVehicle, advance, harness, legacy_full};
use drivelink::device::HEALTH_MAX;
use drivelink::diagnostics::health::{self, ComponentStatus};
use drivelink::error::{DriveError, VehicleError};
use drivelink::observability::ObserverEvent;
use drivelink::vehicle::Command;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn parked_car() -> FakeVehicle {
    FakeVehicle::combined(legacy_full(52.1, 5.2, 0.0, false))
}

#[tokio::test(start_paused = true)]
async fn lock_then_poll_runs_without_extra_follow_up() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;

    h.device.send(Command::Lock);
    h.device.send(Command::poll());
    advance(60).await;

    assert_eq!(h.vehicle.calls(), vec!["full_status", "lock", "full_status"]);
    assert_eq!(h.device.health(), HEALTH_MAX);
    assert!(!h.device.queue().is_running());
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn failure_costs_one_and_next_success_resets() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;

    h.vehicle.fail_next(VehicleError::remote("9999", "vehicle asleep"));
    h.device.send(Command::Unlock);
    advance(2).await;
    assert_eq!(h.device.health(), HEALTH_MAX - 1);

    // Follow-up poll after the 5 s post-wait succeeds.
    advance(10).await;
    assert_eq!(h.device.health(), HEALTH_MAX);
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn busy_consumer_skips_scheduled_poll() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;

    *h.vehicle.command_latency.lock().unwrap() = Duration::from_secs(700);
    h.device.send(Command::StartCharge);
    // Scheduler tick at 10 min finds the consumer still waiting on the car.
    advance(600).await;

    assert_eq!(h.device.health(), HEALTH_MAX - 1);
    assert_eq!(h.vehicle.count("full_status"), 1);
    assert!(
        h.observer
            .events()
            .iter()
            .any(|e| matches!(e, ObserverEvent::PollSkipped { health: 5, .. }))
    );

    advance(120).await;
    assert_eq!(h.device.health(), HEALTH_MAX);
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn exhausted_watchdog_restarts_exactly_once() {
    let vehicle = parked_car();
    vehicle.session_broken.store(true, Ordering::SeqCst);
    let h = harness(vehicle);
    h.device.start().await.unwrap();

    // Start-up poll and two scheduled polls each cost 2 without a session.
    advance(20 * 60 + 10).await;
    assert_eq!(h.device.health(), 0);
    assert_eq!(h.observer.restarts(), 0);

    // The next tick sees the exhausted watchdog.
    advance(10 * 60).await;
    assert_eq!(h.observer.restarts(), 1);
    assert!(h.device.is_restarting());
    assert!(!h.host.is_available());
    assert!(!h.device.queue().is_enabled());
    assert!(!h.device.scheduler().is_running());

    // A second request while restarting is ignored.
    h.device.restart("manual");
    assert_eq!(h.observer.restarts(), 1);

    advance(60).await;
    assert!(!h.device.is_restarting());
    assert_eq!(h.vehicle.logins.load(Ordering::SeqCst), 2);
    assert!(h.device.scheduler().is_running());
    // Fresh watchdog, minus the restart's own session-less start-up poll.
    assert_eq!(h.device.health(), HEALTH_MAX - 2);

    let device = health::component(&format!("device:{}", h.device.name())).unwrap();
    assert_eq!(device.restart_count, 1);
    assert_eq!(device.watchdog, Some(HEALTH_MAX - 2));
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn failed_login_retries_until_start_up_succeeds() {
    let vehicle = parked_car();
    vehicle.login_failures.store(2, Ordering::SeqCst);
    let h = harness(vehicle);

    let err = h.device.start().await.unwrap_err();
    assert!(matches!(err, DriveError::Vehicle(VehicleError::Login(_))));
    assert!(h.device.is_restarting());
    assert!(!h.host.is_available());
    assert_eq!(
        h.host.unavailable_reason().as_deref(),
        Some("login failed: bad credentials")
    );

    advance(61).await;
    assert_eq!(h.vehicle.logins.load(Ordering::SeqCst), 2);
    assert!(h.device.is_restarting());

    advance(60).await;
    assert_eq!(h.vehicle.logins.load(Ordering::SeqCst), 3);
    assert!(!h.device.is_restarting());
    assert!(h.host.is_available());
    assert_eq!(h.observer.restarts(), 1);

    advance(10).await;
    assert_eq!(h.vehicle.count("full_status"), 1);
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_halts_polling() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;

    h.device.stop();
    h.device.stop();
    assert!(!h.device.send(Command::Lock));

    advance(60 * 60).await;
    assert_eq!(h.vehicle.calls(), vec!["full_status"]);
    let scheduler = health::component(&format!("scheduler:{}", h.device.name())).unwrap();
    assert_eq!(scheduler.status, ComponentStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn command_finishing_during_restart_keeps_device_unavailable() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;

    *h.vehicle.command_latency.lock().unwrap() = Duration::from_secs(20);
    h.device.send(Command::Lock);
    advance(1).await;
    h.device.restart("watchdog exhausted");

    // The lock reaches the car while the restart delay is still running.
    advance(25).await;
    assert_eq!(h.vehicle.count("lock"), 1);
    assert!(h.device.is_restarting());
    assert!(!h.host.is_available());
    assert!(!h.device.state().is_available());
    assert!(!h.device.state().is_busy());
    assert!(!h.device.queue().is_enabled());

    advance(60).await;
    assert!(!h.device.is_restarting());
    assert!(h.host.is_available());
    assert!(h.device.state().is_available());
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn session_absent_command_costs_exactly_two() {
    let h = harness(parked_car());
    h.device.start().await.unwrap();
    advance(10).await;
    assert_eq!(h.device.health(), HEALTH_MAX);

    h.vehicle.session_broken.store(true, Ordering::SeqCst);
    h.device.send(Command::Lock);
    advance(30).await;

    assert_eq!(h.device.health(), HEALTH_MAX - 2);
    assert_eq!(h.vehicle.count("lock"), 0);
    // No confirmation poll for a command that never reached the car.
    assert_eq!(h.vehicle.count("full_status"), 1);
    assert!(!h.device.queue().is_running());
    h.device.stop();
}

#[tokio::test(start_paused = true)]
async fn login_failure_is_reported_and_stop_flushes_observer() {
    let vehicle = parked_car();
    vehicle.login_failures.store(1, Ordering::SeqCst);
    let h = harness(vehicle);

    assert!(h.device.start().await.is_err());
    assert_eq!(
        h.observer.errors(),
        vec![(
            format!("device:{}", h.device.name()),
            "login failed: bad credentials".to_string()
        )]
    );

    h.device.stop();
    assert_eq!(h.observer.flushes.load(Ordering::SeqCst), 1);
}
