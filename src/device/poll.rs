use super::DeviceController;
use super::capabilities;
use crate::activity::{Activity, classify};
use crate::error::VehicleError;
use crate::host::{LAST_STATUS_KEY, PARK_LOCATION_KEY, Trigger, save_record};
use crate::status::{NormalizeContext, PollSnapshot, StatusRecord, normalize, resolve_place};
use chrono::Utc;
use tokio::time::Instant;

impl DeviceController {
    /// Fetch, normalize, classify and publish one status poll.
    pub(super) async fn poll(&self, force_once: bool) -> Result<(), VehicleError> {
        let now = Instant::now();
        let refresh = self.lock_state().should_refresh(
            force_once,
            self.config.polling.force_refresh_interval(),
            now,
        );

        let snapshot = self.fetch(refresh).await?;
        if refresh {
            self.lock_state().mark_refreshed(now);
        }

        let (previous, park_location) = {
            let state = self.lock_state();
            (state.last_status().clone(), state.park_location().cloned())
        };
        let ctx = NormalizeContext {
            previous: &previous,
            home: &self.config.home,
            alarms: &self.config.alarms,
        };
        let mut record = normalize(Some(&snapshot), &ctx);
        if record.is_empty() {
            return Err(VehicleError::Other(
                "status payload matched no known schema".into(),
            ));
        }
        resolve_place(&mut record, self.collaborators.geocoder.as_ref()).await;

        let activity = classify(&record, &previous, park_location.as_ref());
        tracing::debug!(
            device = %self.name,
            refresh,
            moving = activity.moving,
            parking = activity.parking,
            car_active = activity.car_active,
            "status polled"
        );

        self.publish(&record, activity);

        if let Err(error) = save_record(self.collaborators.store.as_ref(), LAST_STATUS_KEY, &record)
        {
            tracing::warn!(device = %self.name, %error, "could not persist last status");
        }
        let mode_change = {
            let mut state = self.lock_state();
            state.set_last_status(record);
            state.observe_activity(activity.car_active, Instant::now())
        };
        if let Some(mode) = mode_change {
            self.switch_poll_mode(mode);
        }
        if activity.car_active {
            self.arm_mode_timer();
        }
        Ok(())
    }

    /// Combined status when the vehicle offers it, otherwise the legacy
    /// status plus separate location and odometer reads.
    async fn fetch(&self, refresh: bool) -> Result<PollSnapshot, VehicleError> {
        let vehicle = self.collaborators.vehicle.as_ref();
        if let Some(status) = vehicle.full_status(refresh).await? {
            return Ok(PollSnapshot::new(status));
        }

        let status = vehicle.status(refresh, false).await?;
        let location = vehicle
            .location()
            .await
            .inspect_err(|error| tracing::debug!(%error, "location unavailable"))
            .ok();
        let odometer = vehicle
            .odometer()
            .await
            .inspect_err(|error| tracing::debug!(%error, "odometer unavailable"))
            .ok();
        Ok(PollSnapshot {
            status,
            location,
            odometer,
        })
    }

    fn publish(&self, record: &StatusRecord, activity: Activity) {
        let written = capabilities::publish(record, self.collaborators.capabilities.as_ref());
        tracing::trace!(device = %self.name, written, "capabilities updated");

        let tokens = capabilities::trigger_tokens(record, &Utc::now().to_rfc3339());
        let triggers = self.collaborators.triggers.as_ref();

        if activity.moving {
            triggers.fire(Trigger::HasMoved, &tokens);
        }
        if activity.parking {
            tracing::info!(device = %self.name, location = ?record.location, "vehicle parked");
            triggers.fire(Trigger::HasParked, &tokens);
            self.lock_state().set_park_location(record.clone());
            if let Err(error) =
                save_record(self.collaborators.store.as_ref(), PARK_LOCATION_KEY, record)
            {
                tracing::warn!(device = %self.name, %error, "could not persist park location");
            }
        }
        triggers.fire(Trigger::StatusUpdate, &tokens);
    }
}
