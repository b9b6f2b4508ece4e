//! Vehicle-side vocabulary: the commands the hub can send and the
//! collaborators (cloud session client, geocoder) that carry them out.

mod client;
mod command;
mod geocode;

pub use client::{BoxFuture, ChargeTargets, ClimateSettings, Location, VehicleClient};
pub use command::{Command, CommandKind};
pub use geocode::{Geocoder, NoGeocoder, PlaceDetails, ResolvedPlace};
