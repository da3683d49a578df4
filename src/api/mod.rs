//! Uniform dispatch surface over the per-platform backends.

mod backend;
mod socket;

pub use backend::{Backend, Capabilities, Capability};
pub use socket::Socket;

pub type Result<T> = std::result::Result<T, crate::errors::Error>;
