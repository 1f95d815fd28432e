//! IPv4 protocol - RFC 791

use super::checksum::checksum;
use super::transport::{Transport, TransportMut};
use crate::error::TranslateError;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// IPv4 protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Icmp = 1,
    Udp = 17,
}

impl Protocol {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Protocol::Icmp),
            17 => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// Parsed IPv4 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::Parse("IPv4 header too short".into()));
        }

        let version = buffer[0] >> 4;
        if version != 4 {
            return Err(Error::Parse("not an IPv4 packet".into()));
        }

        let header_len = ((buffer[0] & 0x0F) as usize) * 4;
        if header_len < MIN_HEADER_SIZE {
            return Err(Error::Parse("IPv4 IHL below minimum".into()));
        }

        if buffer.len() < header_len {
            return Err(Error::Parse("IPv4 header truncated".into()));
        }

        Ok(Self { buffer, header_len })
    }

    pub fn version(&self) -> u8 {
        self.buffer[0] >> 4
    }

    pub fn ihl(&self) -> u8 {
        self.buffer[0] & 0x0F
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[10], self.buffer[11]])
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buffer[12],
            self.buffer[13],
            self.buffer[14],
            self.buffer[15],
        )
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buffer[16],
            self.buffer[17],
            self.buffer[18],
            self.buffer[19],
        )
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Payload up to the declared total length, clamped to the buffer
    pub fn payload(&self) -> &'a [u8] {
        let end = (self.total_length() as usize).clamp(self.header_len, self.buffer.len());
        &self.buffer[self.header_len..end]
    }

    /// Typed view of the payload, selected by the protocol field
    pub fn transport(&self) -> Result<Transport<'a>> {
        Transport::parse(self.protocol(), self.payload())
    }

    /// Validate header checksum
    pub fn validate_checksum(&self) -> bool {
        checksum(&self.buffer[..self.header_len]) == 0
    }

    /// Get raw header bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.header_len]
    }
}

/// IPv4 packet rewritten in place inside a caller-owned buffer.
///
/// The slice length is the buffer capacity; `total_len` is the declared
/// packet length and never exceeds it.
#[derive(Debug)]
pub struct Ipv4PacketMut<'a> {
    buffer: &'a mut [u8],
    header_len: usize,
    total_len: usize,
}

impl<'a> Ipv4PacketMut<'a> {
    /// Check the header structure. Nothing is written.
    pub fn new(buffer: &'a mut [u8]) -> std::result::Result<Self, TranslateError> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(TranslateError::Header("buffer shorter than IPv4 header"));
        }
        if buffer[0] >> 4 != 4 {
            return Err(TranslateError::Header("not an IPv4 packet"));
        }

        let header_len = ((buffer[0] & 0x0F) as usize) * 4;
        if header_len < MIN_HEADER_SIZE {
            return Err(TranslateError::Header("IHL below minimum"));
        }

        let total_len = u16::from_be_bytes([buffer[2], buffer[3]]) as usize;
        if total_len < header_len {
            return Err(TranslateError::Header("total length shorter than header"));
        }
        if total_len > buffer.len() {
            return Err(TranslateError::Header("total length exceeds buffer"));
        }

        Ok(Self {
            buffer,
            header_len,
            total_len,
        })
    }

    /// Read-only view over the declared packet
    pub fn header(&self) -> Ipv4Header<'_> {
        Ipv4Header {
            buffer: &self.buffer[..self.total_len],
            header_len: self.header_len,
        }
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.header().src_addr()
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        self.header().dst_addr()
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Declared packet length
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Bytes available for the packet
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Transport segment (header + payload) within the declared length
    pub fn segment(&self) -> &[u8] {
        &self.buffer[self.header_len..self.total_len]
    }

    pub fn segment_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.header_len..self.total_len]
    }

    /// Mutable typed view of the segment, selected by the protocol field
    pub fn transport_mut(&mut self) -> Result<TransportMut<'_>> {
        let protocol = self.protocol();
        TransportMut::parse(protocol, self.segment_mut())
    }

    /// Set destination address (checksum must be updated separately)
    pub fn set_dst_addr(&mut self, addr: Ipv4Addr) {
        self.buffer[16..20].copy_from_slice(&addr.octets());
    }

    /// Set protocol (checksum must be updated separately)
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.buffer[9] = protocol as u8;
    }

    /// Set total length; the caller has already checked it against capacity
    pub fn set_total_length(&mut self, total_len: u16) {
        debug_assert!(total_len as usize <= self.buffer.len());
        self.buffer[2..4].copy_from_slice(&total_len.to_be_bytes());
        self.total_len = total_len as usize;
    }

    /// Recalculate and update header checksum
    pub fn update_checksum(&mut self) {
        // Zero out checksum field first
        self.buffer[10] = 0;
        self.buffer[11] = 0;

        let sum = checksum(&self.buffer[..self.header_len]);
        self.buffer[10..12].copy_from_slice(&sum.to_be_bytes());
    }

    pub fn validate_checksum(&self) -> bool {
        self.header().validate_checksum()
    }
}

/// Builder for constructing IPv4 packets
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    identification: u16,
    dont_fragment: bool,
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            identification: 0,
            dont_fragment: true,
            ttl: 64,
            protocol: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn dont_fragment(mut self, df: bool) -> Self {
        self.dont_fragment = df;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn src_addr(mut self, addr: Ipv4Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv4Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = (MIN_HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = vec![0u8; MIN_HEADER_SIZE + self.payload.len()];

        // Version (4) + IHL (5 = 20 bytes, no options)
        buffer[0] = 0x45;

        buffer[2..4].copy_from_slice(&total_length.to_be_bytes());
        buffer[4..6].copy_from_slice(&self.identification.to_be_bytes());

        if self.dont_fragment {
            buffer[6..8].copy_from_slice(&0x4000u16.to_be_bytes());
        }

        buffer[8] = self.ttl;
        buffer[9] = self.protocol;
        buffer[12..16].copy_from_slice(&self.src_addr.octets());
        buffer[16..20].copy_from_slice(&self.dst_addr.octets());
        buffer[MIN_HEADER_SIZE..].copy_from_slice(&self.payload);

        let sum = checksum(&buffer[..MIN_HEADER_SIZE]);
        buffer[10..12].copy_from_slice(&sum.to_be_bytes());

        buffer
    }
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self::new()
    }
}
