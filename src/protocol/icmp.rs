//! ICMP (Internet Control Message Protocol) - RFC 792
//!
//! Only the echo messages are modelled. The ICMP checksum covers the message
//! alone; unlike UDP there is no pseudo-header over IPv4.

use super::checksum::checksum;
use super::udp::{self, UdpHeaderMut};
use crate::{Error, Result};

/// ICMP header size (echo request/reply)
pub const ICMP_HEADER_SIZE: usize = 8;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestinationUnreachable = 3,
    EchoRequest = 8,
    TimeExceeded = 11,
}

impl IcmpType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IcmpType::EchoReply),
            3 => Some(IcmpType::DestinationUnreachable),
            8 => Some(IcmpType::EchoRequest),
            11 => Some(IcmpType::TimeExceeded),
            _ => None,
        }
    }
}

/// Parsed ICMP message
#[derive(Debug)]
pub struct IcmpPacket<'a> {
    buffer: &'a [u8],
}

impl<'a> IcmpPacket<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < ICMP_HEADER_SIZE {
            return Err(Error::Parse("ICMP packet too short".into()));
        }

        Ok(Self { buffer })
    }

    pub fn icmp_type(&self) -> u8 {
        self.buffer[0]
    }

    pub fn code(&self) -> u8 {
        self.buffer[1]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// For Echo Request/Reply: identifier
    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// For Echo Request/Reply: sequence number
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[ICMP_HEADER_SIZE..]
    }

    /// Get the raw buffer
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }

    /// Validate the ICMP checksum
    pub fn validate_checksum(&self) -> bool {
        icmp_checksum(self.buffer) == 0
    }

    /// Get the typed ICMP message type
    pub fn message_type(&self) -> Option<IcmpType> {
        IcmpType::from_u8(self.icmp_type())
    }

    pub fn is_echo_request(&self) -> bool {
        self.icmp_type() == IcmpType::EchoRequest as u8
    }

    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type() == IcmpType::EchoReply as u8
    }
}

/// ICMP message rewritten in place. The slice spans header and payload.
#[derive(Debug)]
pub struct IcmpHeaderMut<'a> {
    buffer: &'a mut [u8],
}

impl<'a> IcmpHeaderMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self> {
        if buffer.len() < ICMP_HEADER_SIZE {
            return Err(Error::Parse("ICMP packet too short".into()));
        }

        Ok(Self { buffer })
    }

    pub fn icmp_type(&self) -> u8 {
        self.buffer[0]
    }

    pub fn code(&self) -> u8 {
        self.buffer[1]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    pub fn is_echo_request(&self) -> bool {
        self.icmp_type() == IcmpType::EchoRequest as u8
    }

    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type() == IcmpType::EchoReply as u8
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[ICMP_HEADER_SIZE..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[ICMP_HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }

    pub fn validate_checksum(&self) -> bool {
        icmp_checksum(self.buffer) == 0
    }

    /// Update checksum over header and payload
    pub fn update_checksum(&mut self) {
        self.buffer[2] = 0;
        self.buffer[3] = 0;

        let sum = icmp_checksum(self.buffer);
        self.buffer[2..4].copy_from_slice(&sum.to_be_bytes());
    }

    /// Reinterpret the message as a UDP datagram.
    ///
    /// The UDP length covers the whole slice; the checksum is zeroed and must
    /// be computed once the IP addresses are final.
    pub fn into_udp(self, src_port: u16, dst_port: u16) -> UdpHeaderMut<'a> {
        let buffer = self.buffer;
        let length = buffer.len() as u16;
        buffer[0..2].copy_from_slice(&src_port.to_be_bytes());
        buffer[2..4].copy_from_slice(&dst_port.to_be_bytes());
        buffer[4..6].copy_from_slice(&length.to_be_bytes());
        buffer[6..8].copy_from_slice(&[0, 0]);
        UdpHeaderMut::from_header_bytes(buffer)
    }

    pub(super) fn from_header_bytes(buffer: &'a mut [u8]) -> Self {
        debug_assert!(buffer.len() >= udp::HEADER_SIZE);
        Self { buffer }
    }
}

/// Build an ICMP Echo Reply from an Echo Request
pub fn build_echo_reply(request: &[u8]) -> Result<Vec<u8>> {
    if request.len() < ICMP_HEADER_SIZE {
        return Err(Error::Parse("ICMP request too short".into()));
    }

    let mut reply = request.to_vec();
    reply[0] = IcmpType::EchoReply as u8;

    let mut icmp = IcmpHeaderMut::from_header_bytes(&mut reply);
    icmp.update_checksum();

    Ok(reply)
}

/// Calculate ICMP checksum (no pseudo-header)
pub fn icmp_checksum(data: &[u8]) -> u16 {
    checksum(data)
}

/// Builder for ICMP Echo Request packets
#[derive(Debug, Clone)]
pub struct EchoRequestBuilder {
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
}

impl EchoRequestBuilder {
    pub fn new(identifier: u16, sequence: u16) -> Self {
        Self {
            identifier,
            sequence,
            payload: Vec::new(),
        }
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the ICMP Echo Request packet
    pub fn build(self) -> Vec<u8> {
        let mut packet = vec![0u8; ICMP_HEADER_SIZE + self.payload.len()];

        packet[0] = IcmpType::EchoRequest as u8;
        packet[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        packet[6..8].copy_from_slice(&self.sequence.to_be_bytes());
        packet[ICMP_HEADER_SIZE..].copy_from_slice(&self.payload);

        let checksum = icmp_checksum(&packet);
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());

        packet
    }
}
