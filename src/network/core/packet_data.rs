use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Direction of a captured packet relative to this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Arriving at this host (download)
    Inbound,
    /// Leaving this host (upload)
    Outbound,
}

impl Direction {
    /// Classifies a packet from the interception layer's outbound flag.
    pub fn from_outbound(is_outbound: bool) -> Self {
        if is_outbound {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }

}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
        }
    }
}

/// A captured packet with the metadata the shaper needs.
///
/// The payload is opaque to everything except the source that produced it;
/// it is handed back to that source untouched on reinjection.
#[derive(Debug, Clone)]
pub struct PacketData<P> {
    /// The raw packet as produced by the capture backend
    pub payload: P,

    /// Size of the packet on the wire in bytes
    pub length: u32,

    /// Whether this packet is outbound (upload) or inbound (download)
    pub direction: Direction,

    /// Timestamp when the packet was captured
    pub arrival_time: Instant,
}

impl<P> PacketData<P> {
    /// Creates a `PacketData` stamped with the current time.
    pub fn new(payload: P, length: u32, direction: Direction) -> Self {
        PacketData {
            payload,
            length,
            direction,
            arrival_time: Instant::now(),
        }
    }

    /// Returns the time elapsed since the packet was captured
    pub fn age(&self) -> std::time::Duration {
        self.arrival_time.elapsed()
    }
}

impl PacketData<Vec<u8>> {
    /// Wraps a raw byte buffer, taking the length from the buffer itself.
    pub fn from_bytes(bytes: Vec<u8>, direction: Direction) -> Self {
        let length = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        Self::new(bytes, length, direction)
    }
}
