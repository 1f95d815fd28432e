//! UDP protocol - RFC 768
//!
//! UDP header views and checksum calculation.

use super::checksum::{ChecksumSpan, PseudoHeader};
use super::icmp::{IcmpHeaderMut, IcmpType, ICMP_HEADER_SIZE};
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// UDP header size (fixed)
pub const HEADER_SIZE: usize = 8;

/// UDP protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 17;

// The UDP and ICMP echo headers overlay the same bytes when a segment is
// reinterpreted in place.
const _: () = assert!(HEADER_SIZE == ICMP_HEADER_SIZE);

/// Parsed UDP header (zero-copy reference)
#[derive(Debug)]
pub struct UdpHeader<'a> {
    buffer: &'a [u8],
}

impl<'a> UdpHeader<'a> {
    /// Parse UDP header from buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("UDP header too short".into()));
        }

        Ok(Self { buffer })
    }

    /// Source port (offset 0-1)
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    /// Destination port (offset 2-3)
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Length (header + data) (offset 4-5)
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// Checksum (offset 6-7)
    /// Note: 0 means checksum not computed (valid for UDP over IPv4)
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    /// Payload (data after header)
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_SIZE..]
    }

    /// Validate checksum with pseudo-header
    /// Returns true if checksum is valid or if checksum is 0 (not computed)
    pub fn validate_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> bool {
        if self.checksum() == 0 {
            return true;
        }
        udp_checksum(src_ip, dst_ip, self.buffer) == 0
    }
}

/// UDP segment rewritten in place. The slice spans header and payload.
#[derive(Debug)]
pub struct UdpHeaderMut<'a> {
    buffer: &'a mut [u8],
}

impl<'a> UdpHeaderMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("UDP datagram too short".into()));
        }

        Ok(Self { buffer })
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..]
    }

    /// Set source port (checksum must be updated separately)
    pub fn set_src_port(&mut self, port: u16) {
        self.buffer[0..2].copy_from_slice(&port.to_be_bytes());
    }

    /// Set destination port (checksum must be updated separately)
    pub fn set_dst_port(&mut self, port: u16) {
        self.buffer[2..4].copy_from_slice(&port.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }

    pub fn validate_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> bool {
        UdpHeader { buffer: &*self.buffer }.validate_checksum(src_ip, dst_ip)
    }

    /// Update checksum for the given IP addresses
    pub fn update_checksum(&mut self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) {
        // Zero out checksum field first
        self.buffer[6] = 0;
        self.buffer[7] = 0;

        let sum = udp_checksum(src_ip, dst_ip, self.buffer);

        // For UDP, if computed checksum is 0, use 0xFFFF instead
        // (0 is reserved for "no checksum")
        let sum = if sum == 0 { 0xFFFF } else { sum };

        self.buffer[6..8].copy_from_slice(&sum.to_be_bytes());
    }

    /// Reinterpret the segment as an ICMP echo request.
    ///
    /// Writes type, code, identifier and sequence over the UDP header and
    /// zeroes the checksum. The payload is left as is.
    pub fn into_icmp_echo(self, identifier: u16, sequence: u16) -> IcmpHeaderMut<'a> {
        let buffer = self.buffer;
        buffer[0] = IcmpType::EchoRequest as u8;
        buffer[1] = 0;
        buffer[2..4].copy_from_slice(&[0, 0]);
        buffer[4..6].copy_from_slice(&identifier.to_be_bytes());
        buffer[6..8].copy_from_slice(&sequence.to_be_bytes());
        IcmpHeaderMut::from_header_bytes(buffer)
    }

    pub(super) fn from_header_bytes(buffer: &'a mut [u8]) -> Self {
        debug_assert!(buffer.len() >= HEADER_SIZE);
        Self { buffer }
    }
}

/// UDP packet builder for creating new UDP datagrams
#[derive(Debug, Clone, Default)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
    /// Create a new UDP builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the UDP datagram with checksum
    pub fn build(self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
        let length = (HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = vec![0u8; HEADER_SIZE + self.payload.len()];

        buffer[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buffer[4..6].copy_from_slice(&length.to_be_bytes());
        buffer[HEADER_SIZE..].copy_from_slice(&self.payload);

        let mut udp = UdpHeaderMut::from_header_bytes(&mut buffer);
        udp.update_checksum(src_ip, dst_ip);

        buffer
    }
}

/// Calculate UDP checksum with pseudo-header (RFC 768)
///
/// The pseudo-header length is the datagram length as seen in `udp_datagram`.
pub fn udp_checksum(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, udp_datagram: &[u8]) -> u16 {
    let pseudo = PseudoHeader::new(
        src_ip,
        dst_ip,
        PROTOCOL_NUMBER,
        udp_datagram.len() as u16,
    );
    ChecksumSpan::with_pseudo_header(udp_datagram, pseudo).compute()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_udp_datagram() -> Vec<u8> {
        UdpBuilder::new()
            .src_port(12345)
            .dst_port(53)
            .payload(b"test")
            .build(Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(8, 8, 8, 8))
    }

    #[test]
    fn test_udp_header_parse() {
        let dgram = make_udp_datagram();
        let hdr = UdpHeader::parse(&dgram).unwrap();

        assert_eq!(hdr.src_port(), 12345);
        assert_eq!(hdr.dst_port(), 53);
        assert_eq!(hdr.length(), 12);
        assert_eq!(hdr.payload(), b"test");
    }

    #[test]
    fn test_udp_header_parse_too_short() {
        assert!(UdpHeader::parse(&[0u8; 7]).is_err());
        assert!(UdpHeaderMut::new(&mut [0u8; 7]).is_err());
    }

    #[test]
    fn test_udp_header_validate_checksum() {
        let dgram = make_udp_datagram();
        let hdr = UdpHeader::parse(&dgram).unwrap();
        assert!(hdr.validate_checksum(Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(8, 8, 8, 8)));
        // Pseudo-header binds the addresses
        assert!(!hdr.validate_checksum(Ipv4Addr::new(192, 168, 1, 101), Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_udp_header_no_checksum() {
        let mut dgram = make_udp_datagram();
        dgram[6] = 0;
        dgram[7] = 0;

        let hdr = UdpHeader::parse(&dgram).unwrap();
        assert!(hdr.validate_checksum(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2)));
    }

    #[test]
    fn test_udp_mut_set_ports_and_update_checksum() {
        let mut dgram = make_udp_datagram();
        let mut udp = UdpHeaderMut::new(&mut dgram).unwrap();

        udp.set_src_port(54321);
        udp.set_dst_port(5353);

        let src = Ipv4Addr::new(203, 0, 113, 1);
        let dst = Ipv4Addr::new(8, 8, 8, 8);
        assert!(!udp.validate_checksum(src, dst));
        udp.update_checksum(src, dst);
        assert!(udp.validate_checksum(src, dst));

        assert_eq!(udp.src_port(), 54321);
        assert_eq!(udp.dst_port(), 5353);
    }

    #[test]
    fn test_into_icmp_echo_overwrites_header_only() {
        let mut dgram = make_udp_datagram();
        let udp = UdpHeaderMut::new(&mut dgram).unwrap();

        let icmp = udp.into_icmp_echo(12345, 1);
        assert!(icmp.is_echo_request());
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.checksum(), 0);
        assert_eq!(icmp.identifier(), 12345);
        assert_eq!(icmp.sequence(), 1);
        assert_eq!(icmp.payload(), b"test");
    }

    #[test]
    fn test_udp_checksum_odd_length() {
        let dgram = UdpBuilder::new()
            .src_port(12345)
            .dst_port(53)
            .payload(b"hello")
            .build(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2));

        assert_eq!(dgram.len(), 13);
        let hdr = UdpHeader::parse(&dgram).unwrap();
        assert!(hdr.validate_checksum(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)));
    }
}
