//! Backend trait and capability set.

use super::Result;
use crate::errors::Error;
use crate::types::{Direction, LinkType, Timestamp, TimestampPrecision};

/// One optional operation a backend may or may not support.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    SetDirection = 0,
    SetNonBlocking = 1,
    SetPromiscuous = 2,
    SetTimestampPrecision = 3,
}

/// The fixed capability set a backend declares at open time.
///
/// Built once during backend initialization and never mutated afterwards;
/// the dispatcher consults it before forwarding any optional operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);

    pub const fn with(self, cap: Capability) -> Self {
        Capabilities(self.0 | (1u8 << cap as u8))
    }

    pub const fn supports(&self, cap: Capability) -> bool {
        self.0 & (1u8 << cap as u8) != 0
    }

    pub const fn all() -> Self {
        Capabilities::NONE
            .with(Capability::SetDirection)
            .with(Capability::SetNonBlocking)
            .with(Capability::SetPromiscuous)
            .with(Capability::SetTimestampPrecision)
    }
}

/// A platform backend behind a [`Socket`](super::Socket).
///
/// `recv`, `send` and `finalize` are mandatory. The configuration
/// operations are optional: a backend advertises the ones it implements
/// through [`capabilities`](Backend::capabilities), and the dispatcher
/// never invokes an operation that is not advertised. The default bodies
/// answer `NotSupported` so an unadvertised operation stays safe even if
/// called directly.
pub trait Backend: Send {
    /// Receives one frame into `buf`, returning the frame length and its
    /// capture timestamp.
    fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, Timestamp)>;

    /// Transmits one frame, returning the number of bytes written.
    fn send(&mut self, buf: &[u8]) -> Result<usize>;

    /// The link-layer type negotiated during initialization.
    fn link_type(&self) -> LinkType;

    /// The optional operations this backend implements. Fixed after init.
    fn capabilities(&self) -> Capabilities;

    /// Releases OS-level resources. Invoked exactly once, by the owning
    /// socket, before the backend is dropped.
    fn finalize(&mut self);

    fn set_direction(&mut self, _direction: Direction) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn set_nonblocking(&mut self, _nonblock: bool) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn set_promiscuous(&mut self, _promisc: bool) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn set_timestamp_precision(&mut self, _precision: TimestampPrecision) -> Result<()> {
        Err(Error::NotSupported)
    }

    /// Frames dropped on the kernel/device side, if the backend can tell.
    fn dropped(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_is_a_bitset() {
        let caps = Capabilities::NONE
            .with(Capability::SetPromiscuous)
            .with(Capability::SetNonBlocking);
        assert!(caps.supports(Capability::SetPromiscuous));
        assert!(caps.supports(Capability::SetNonBlocking));
        assert!(!caps.supports(Capability::SetDirection));
        assert!(!caps.supports(Capability::SetTimestampPrecision));
    }

    #[test]
    fn all_covers_every_capability() {
        let caps = Capabilities::all();
        for cap in [
            Capability::SetDirection,
            Capability::SetNonBlocking,
            Capability::SetPromiscuous,
            Capability::SetTimestampPrecision,
        ] {
            assert!(caps.supports(cap));
        }
    }

    #[test]
    fn none_supports_nothing() {
        assert!(!Capabilities::NONE.supports(Capability::SetDirection));
        assert_eq!(Capabilities::NONE, Capabilities::default());
    }
}
