use std::fmt;

/// Traffic direction filter for a link-layer socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    InOut,
}

/// Requested precision for receive timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampPrecision {
    Micro,
    Nano,
}

/// Capture time of a received frame.
///
/// Sub-second resolution depends on the backend and on the configured
/// [`TimestampPrecision`]; `nanos` holds microseconds scaled to
/// nanoseconds when the backend only provides microsecond stamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
    pub precision: TimestampPrecision,
}

impl Timestamp {
    pub const fn zero() -> Self {
        Self {
            secs: 0,
            nanos: 0,
            precision: TimestampPrecision::Micro,
        }
    }
}

/// Data-link layer encapsulation negotiated by the backend at open time.
///
/// Values follow the conventional DLT numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkType(pub i32);

impl LinkType {
    pub const NULL: LinkType = LinkType(0);
    pub const ETHERNET: LinkType = LinkType(1);
    pub const RAW: LinkType = LinkType(101);
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LinkType::NULL => write!(f, "null"),
            LinkType::ETHERNET => write!(f, "ethernet"),
            LinkType::RAW => write!(f, "raw"),
            LinkType(other) => write!(f, "dlt({other})"),
        }
    }
}

/// Cumulative per-socket counters, copied out by value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
}
