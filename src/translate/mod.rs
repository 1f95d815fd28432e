//! In-place UDP ⇄ ICMP echo translation
//!
//! The forward transform turns a UDP probe addressed to the trigger address
//! into an ICMP echo request for the target named in its payload. The reverse
//! transform turns the matching echo reply back into a UDP datagram addressed
//! from the trigger address. All correlation data travels in the packet, so a
//! [`Translator`] holds nothing but its constants.
//!
//! Limitation: the smuggled port pair lives in the echo payload. Anything on
//! the path that rewrites payload bytes breaks the round trip.

pub mod forward;
pub mod metadata;
pub mod reverse;

use crate::config::TranslatorConfig;
use crate::error::TranslateError;
use crate::protocol::icmp::ICMP_HEADER_SIZE;
use crate::protocol::ipv4;
use crate::protocol::udp;
use std::fmt;
use std::net::Ipv4Addr;

pub use metadata::{ProbeRequest, SmuggledPorts, METADATA_SIZE};

/// Change in transport header size when a UDP header becomes an ICMP echo
/// header. The reverse transform applies the negation.
pub const HEADER_DELTA: isize = ICMP_HEADER_SIZE as isize - udp::HEADER_SIZE as isize;

/// Which hook point a packet was seen at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Transmit path: UDP probe → ICMP echo request
    Outbound,
    /// Receive path: ICMP echo reply → UDP datagram
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// What a successful rewrite did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// New IPv4 destination
    pub destination: Ipv4Addr,
    /// Original UDP source port, carried as the echo identifier
    pub correlation_port: u16,
    /// Original UDP destination port, carried in the echo payload
    pub original_dst_port: u16,
    /// New IPv4 total length
    pub total_length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    Converted(Conversion),
    /// Packet is not a translation candidate; not a single byte was written
    NotApplicable,
}

impl Translation {
    pub fn is_converted(&self) -> bool {
        matches!(self, Translation::Converted(_))
    }
}

/// Stateless translation engine.
///
/// Each call takes exclusive access to one packet buffer. The slice length
/// is the buffer capacity; the IPv4 total-length field is the packet length.
/// On any error the buffer is left exactly as it was.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// UDP probe → ICMP echo request
    pub fn forward(&self, buffer: &mut [u8]) -> Result<Translation, TranslateError> {
        forward::udp_to_icmp(&self.config, buffer)
    }

    /// ICMP echo reply → UDP datagram
    pub fn reverse(&self, buffer: &mut [u8]) -> Result<Translation, TranslateError> {
        reverse::icmp_to_udp(&self.config, buffer)
    }

    pub fn translate(
        &self,
        direction: Direction,
        buffer: &mut [u8],
    ) -> Result<Translation, TranslateError> {
        match direction {
            Direction::Outbound => self.forward(buffer),
            Direction::Inbound => self.reverse(buffer),
        }
    }
}

/// Protocol and destination of an IPv4 packet, read before any structural
/// validation so unrelated traffic never reports an error.
///
/// `None` for anything that is not IPv4 or is shorter than a bare header.
fn peek(buffer: &[u8]) -> Option<(u8, Ipv4Addr)> {
    if buffer.len() < ipv4::MIN_HEADER_SIZE || buffer[0] >> 4 != 4 {
        return None;
    }
    let dst = Ipv4Addr::new(buffer[16], buffer[17], buffer[18], buffer[19]);
    Some((buffer[9], dst))
}

/// Fail with `Truncated` unless `needed` bytes fit in the declared length
fn require_declared(needed: usize, declared: usize) -> Result<(), TranslateError> {
    if declared < needed {
        return Err(TranslateError::Truncated { needed, declared });
    }
    Ok(())
}

/// Total length after the transport header grows or shrinks by `delta`.
///
/// Fails closed when the result does not fit the buffer or the 16-bit
/// total-length field.
pub(crate) fn resize_total(
    total: usize,
    delta: isize,
    capacity: usize,
) -> Result<u16, TranslateError> {
    let required = total.checked_add_signed(delta).ok_or(TranslateError::Header(
        "header delta exceeds packet length",
    ))?;

    if required > capacity {
        return Err(TranslateError::CapacityOverflow { required, capacity });
    }

    u16::try_from(required).map_err(|_| TranslateError::CapacityOverflow {
        required,
        capacity: u16::MAX as usize,
    })
}
