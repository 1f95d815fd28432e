//! Metadata carried in the first 8 payload bytes after the transport header
//!
//! Probe request (UDP payload, sent by the prober):
//! ```text
//! +--------+--------+--------+--------+
//! |          Target Address           |
//! +--------+--------+--------+--------+
//! |              Marker               |
//! +--------+--------+--------+--------+
//! ```
//!
//! Smuggled ports (ICMP echo payload, written by the forward transform):
//! ```text
//! +--------+--------+--------+--------+
//! |  Original Src   |  Original Dst   |
//! +--------+--------+--------+--------+
//! |              Marker               |
//! +--------+--------+--------+--------+
//! ```
//!
//! The marker sits at bytes 4..8 in both layouts, so a reply that went
//! through both transforms still carries it where the prober looks.

use std::net::Ipv4Addr;

/// Size of either metadata layout
pub const METADATA_SIZE: usize = 8;

/// Offset of the marker within the metadata
pub const MARKER_OFFSET: usize = 4;

/// Read the marker from a payload, if it is long enough
pub fn marker(payload: &[u8]) -> Option<u32> {
    let bytes = payload.get(MARKER_OFFSET..METADATA_SIZE)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Forward-direction payload: where to send the echo, and the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRequest {
    pub target: Ipv4Addr,
    pub marker: u32,
}

impl ProbeRequest {
    pub fn new(target: Ipv4Addr, marker: u32) -> Self {
        Self { target, marker }
    }

    pub fn parse(payload: &[u8]) -> Option<Self> {
        let bytes = payload.get(..METADATA_SIZE)?;
        Some(Self {
            target: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            marker: marker(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut out = [0u8; METADATA_SIZE];
        out[..4].copy_from_slice(&self.target.octets());
        out[MARKER_OFFSET..].copy_from_slice(&self.marker.to_be_bytes());
        out
    }
}

/// Post-conversion ICMP payload: the original UDP port pair and the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmuggledPorts {
    pub src_port: u16,
    pub dst_port: u16,
    pub marker: u32,
}

impl SmuggledPorts {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let bytes = payload.get(..METADATA_SIZE)?;
        Some(Self {
            src_port: u16::from_be_bytes([bytes[0], bytes[1]]),
            dst_port: u16::from_be_bytes([bytes[2], bytes[3]]),
            marker: marker(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut out = [0u8; METADATA_SIZE];
        out[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        out[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        out[MARKER_OFFSET..].copy_from_slice(&self.marker.to_be_bytes());
        out
    }

    /// Overwrite the first 8 bytes of `payload`
    pub fn write(&self, payload: &mut [u8]) {
        payload[..METADATA_SIZE].copy_from_slice(&self.to_bytes());
    }
}
