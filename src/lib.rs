#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod activity;
pub mod config;
pub mod device;
#[doc(hidden)]
pub mod diagnostics;
pub mod error;
pub mod host;
#[doc(hidden)]
pub mod observability;
pub mod queue;
pub mod scheduler;
pub mod status;
pub mod vehicle;

pub use config::Config;
pub use device::{Collaborators, DeviceController};
pub use error::{DriveError, Result};
