//! Internet checksum - RFC 1071
//!
//! Shared by the IPv4 header, ICMP and UDP code paths. Only UDP uses the
//! pseudo-header; ICMP over IPv4 is summed over the message alone.

use std::net::Ipv4Addr;

/// Serialized pseudo-header size
pub const PSEUDO_HEADER_SIZE: usize = 12;

/// Transport pseudo-header (RFC 768)
///
/// ```text
/// +--------+--------+--------+--------+
/// |          Source Address           |
/// +--------+--------+--------+--------+
/// |        Destination Address        |
/// +--------+--------+--------+--------+
/// |  Zero  |Protocol|  Segment Length |
/// +--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub length: u16,
}

impl PseudoHeader {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, length: u16) -> Self {
        Self {
            src,
            dst,
            protocol,
            length,
        }
    }

    /// Big-endian wire layout
    pub fn to_bytes(&self) -> [u8; PSEUDO_HEADER_SIZE] {
        let mut out = [0u8; PSEUDO_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.src.octets());
        out[4..8].copy_from_slice(&self.dst.octets());
        out[8] = 0;
        out[9] = self.protocol;
        out[10..12].copy_from_slice(&self.length.to_be_bytes());
        out
    }
}

/// A byte range to checksum, optionally prefixed by a pseudo-header.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumSpan<'a> {
    data: &'a [u8],
    pseudo: Option<PseudoHeader>,
}

impl<'a> ChecksumSpan<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pseudo: None }
    }

    pub fn with_pseudo_header(data: &'a [u8], pseudo: PseudoHeader) -> Self {
        Self {
            data,
            pseudo: Some(pseudo),
        }
    }

    /// Ones'-complement of the folded ones'-complement sum.
    ///
    /// The pseudo-header is 12 bytes, so summing it separately keeps word
    /// alignment with the data that follows.
    pub fn compute(&self) -> u16 {
        let mut sum = 0u32;
        if let Some(pseudo) = self.pseudo {
            sum = add_words(sum, &pseudo.to_bytes());
        }
        sum = add_words(sum, self.data);
        !fold(sum)
    }
}

/// Checksum over `data` with no pseudo-header.
pub fn checksum(data: &[u8]) -> u16 {
    ChecksumSpan::new(data).compute()
}

fn add_words(mut sum: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
        // Keep the accumulator from wrapping on very long spans
        if sum >> 31 != 0 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add(u16::from_be_bytes([*last, 0]) as u32);
    }
    sum
}

/// Fold 32-bit sum to 16 bits
fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_rfc1071_example() {
        // RFC 1071 section 3 example: sum = 0xddf2, checksum = !0xddf2
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2);
    }

    #[test]
    fn test_checksum_known_ipv4_header() {
        // Header from Wikipedia's IPv4 checksum walkthrough
        let header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(checksum(&header), 0xb861);
    }

    #[test]
    fn test_checksum_validates_to_zero() {
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        let sum = checksum(&header);
        header[10..12].copy_from_slice(&sum.to_be_bytes());
        assert_eq!(checksum(&header), 0);
    }

    #[test]
    fn test_checksum_odd_length_pads_high_byte() {
        // Trailing 0xAB counts as 0xAB00
        assert_eq!(checksum(&[0xAB]), !0xAB00);
        assert_eq!(checksum(&[0x12, 0x34, 0xAB]), !(0x1234u16 + 0xAB00));
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_pseudo_header_layout() {
        let pseudo = PseudoHeader::new(
            Ipv4Addr::new(192, 168, 1, 100),
            Ipv4Addr::new(8, 8, 8, 8),
            17,
            12,
        );
        assert_eq!(
            pseudo.to_bytes(),
            [192, 168, 1, 100, 8, 8, 8, 8, 0, 17, 0, 12]
        );
    }

    #[test]
    fn test_span_with_pseudo_header_matches_concatenation() {
        let pseudo = PseudoHeader::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 17, 9);
        let data = [0x30, 0x39, 0x00, 0x35, 0x00, 0x09, 0x00, 0x00, b'x'];

        let mut joined = pseudo.to_bytes().to_vec();
        joined.extend_from_slice(&data);

        assert_eq!(
            ChecksumSpan::with_pseudo_header(&data, pseudo).compute(),
            checksum(&joined)
        );
    }

    #[test]
    fn test_long_span_does_not_overflow() {
        let data = vec![0xFF; 200_000];
        let sum = checksum(&data);
        assert_eq!(sum, 0);
    }
}
