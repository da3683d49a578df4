//! The socket handle and its dispatch logic.

use log::{debug, trace};

use super::Result;
use super::backend::{Backend, Capability};
use crate::errors::Error;
use crate::types::{Direction, LinkType, Stats, Timestamp, TimestampPrecision};

/// One open link-layer socket.
///
/// A `Socket` is only ever observed fully initialized: `open` either
/// returns a handle whose backend has negotiated a link type and declared
/// its capability set, or an error. The device name is immutable for the
/// handle's lifetime, and the backend finalizer runs exactly once when the
/// handle is closed or dropped.
///
/// Calls are synchronous and potentially blocking; blocking semantics
/// belong entirely to the backend and the OS. A `Socket` is `Send` but
/// offers no internal synchronization, so keep it owned by one thread at
/// a time.
pub struct Socket {
    device: String,
    buffer_len: usize,
    backend: Box<dyn Backend>,
    stats: Stats,
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("device", &self.device)
            .field("buffer_len", &self.buffer_len)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Socket {
    /// Opens a link-layer socket on `device`.
    ///
    /// `buffer_len` is the desired receive buffer size; how (and whether)
    /// it is honored is up to the backend. Backend initialization errors
    /// propagate unchanged, and any resources the backend acquired before
    /// failing are released by the backend itself.
    pub fn open(device: &str, buffer_len: usize) -> Result<Self> {
        if device.is_empty() {
            return Err(Error::Generic);
        }
        let backend = open_platform(device, buffer_len)?;
        debug!(
            "opened {device}: link type {}, caps {:?}",
            backend.link_type(),
            backend.capabilities()
        );
        Ok(Self::from_backend(device, buffer_len, backend))
    }

    pub(crate) fn from_backend(device: &str, buffer_len: usize, backend: Box<dyn Backend>) -> Self {
        Self {
            device: device.to_owned(),
            buffer_len,
            backend,
            stats: Stats::default(),
        }
    }

    /// Receives one frame into `buf`.
    ///
    /// Returns the frame length and its capture timestamp, whose precision
    /// is backend-defined. [`Error::Interrupted`] and [`Error::NoPacket`]
    /// are retryable.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, Timestamp)> {
        let (len, ts) = self.backend.recv(buf)?;
        self.stats.rx_packets += 1;
        self.stats.rx_bytes += len as u64;
        trace!("{}: rx {len} bytes", self.device);
        Ok((len, ts))
    }

    /// Transmits one frame.
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        let len = self.backend.send(buf)?;
        self.stats.tx_packets += 1;
        self.stats.tx_bytes += len as u64;
        trace!("{}: tx {len} bytes", self.device);
        Ok(len)
    }

    /// Restricts capture to the given traffic direction.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.gated(Capability::SetDirection)?
            .set_direction(direction)
    }

    /// Toggles non-blocking mode on the underlying descriptor.
    pub fn set_nonblocking(&mut self, nonblock: bool) -> Result<()> {
        self.gated(Capability::SetNonBlocking)?
            .set_nonblocking(nonblock)
    }

    /// Toggles promiscuous mode on the device.
    pub fn set_promiscuous(&mut self, promisc: bool) -> Result<()> {
        self.gated(Capability::SetPromiscuous)?
            .set_promiscuous(promisc)
    }

    /// Selects the timestamp precision for subsequent receives.
    pub fn set_timestamp_precision(&mut self, precision: TimestampPrecision) -> Result<()> {
        self.gated(Capability::SetTimestampPrecision)?
            .set_timestamp_precision(precision)
    }

    /// The single capability gate: every optional operation passes through
    /// here, so absent capabilities answer `NotSupported` uniformly and
    /// before the backend is touched.
    fn gated(&mut self, cap: Capability) -> Result<&mut dyn Backend> {
        if !self.backend.capabilities().supports(cap) {
            return Err(Error::NotSupported);
        }
        Ok(self.backend.as_mut())
    }

    /// The link-layer type negotiated at open time. Stable until close.
    pub fn link_type(&self) -> LinkType {
        self.backend.link_type()
    }

    /// Snapshot of the cumulative counters, including kernel-side drops
    /// when the backend can report them.
    pub fn stats(&self) -> Stats {
        let mut stats = self.stats;
        stats.rx_dropped = self.backend.dropped();
        stats
    }

    /// The device name this socket was opened on.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// The recorded receive buffer length.
    pub fn buffer_size(&self) -> usize {
        self.buffer_len
    }

    /// Records a new desired buffer length. Metadata only: the backend
    /// picks it up on its next resize, nothing is reallocated here.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.buffer_len = size;
    }

    /// Closes the socket, running the backend finalizer.
    ///
    /// Equivalent to dropping the handle; provided for callers that want
    /// the release to be explicit. The move makes use-after-close
    /// unrepresentable.
    pub fn close(self) {}
}

impl Drop for Socket {
    fn drop(&mut self) {
        debug!("closing {}", self.device);
        self.backend.finalize();
    }
}

#[cfg(target_os = "linux")]
fn open_platform(device: &str, buffer_len: usize) -> Result<Box<dyn Backend>> {
    Ok(Box::new(crate::af_packet::Sock::open(device, buffer_len)?))
}

#[cfg(not(target_os = "linux"))]
fn open_platform(_device: &str, _buffer_len: usize) -> Result<Box<dyn Backend>> {
    Err(Error::NotSupported)
}
