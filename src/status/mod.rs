//! Telemetry normalization: three upstream schemas in, one canonical
//! [`StatusRecord`] out.

mod normalize;
mod raw;
mod record;

pub use normalize::{NormalizeContext, normalize, resolve_place};
pub use raw::{PollSnapshot, RawStatus};
pub use record::{ChargePhase, Coordinates, StatusRecord};
