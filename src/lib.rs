//! Uniform handle over link-layer (raw/device-level) sockets.
//!
//! [`Socket::open`] resolves the platform backend once, at open time; every
//! later call dispatches through the handle. Backends declare which of the
//! optional configuration operations they implement, and the dispatcher
//! answers [`Error::NotSupported`] for the rest instead of failing in
//! backend-specific ways.

#[cfg(target_os = "linux")]
pub mod af_packet;
pub mod api;
pub mod errors;
pub mod types;

pub use api::{Backend, Capabilities, Capability, Result, Socket};
pub use errors::{Error, strerror};
pub use types::{Direction, LinkType, Stats, Timestamp, TimestampPrecision};
