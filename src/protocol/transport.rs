//! Transport header views keyed by the IPv4 protocol field
//!
//! A segment is only ever read through the view matching the protocol byte.
//! Switching a segment between UDP and ICMP goes through the consuming
//! conversions on the mutable views.

use super::icmp::{IcmpHeaderMut, IcmpPacket};
use super::ipv4::Protocol;
use super::udp::{UdpHeader, UdpHeaderMut};
use crate::Result;

#[derive(Debug)]
pub enum Transport<'a> {
    Udp(UdpHeader<'a>),
    Icmp(IcmpPacket<'a>),
    /// Any other protocol number; not interpreted
    Other(u8),
}

impl<'a> Transport<'a> {
    pub fn parse(protocol: u8, segment: &'a [u8]) -> Result<Self> {
        Ok(match Protocol::from_u8(protocol) {
            Some(Protocol::Udp) => Transport::Udp(UdpHeader::parse(segment)?),
            Some(Protocol::Icmp) => Transport::Icmp(IcmpPacket::parse(segment)?),
            None => Transport::Other(protocol),
        })
    }
}

#[derive(Debug)]
pub enum TransportMut<'a> {
    Udp(UdpHeaderMut<'a>),
    Icmp(IcmpHeaderMut<'a>),
    Other(u8),
}

impl<'a> TransportMut<'a> {
    pub fn parse(protocol: u8, segment: &'a mut [u8]) -> Result<Self> {
        Ok(match Protocol::from_u8(protocol) {
            Some(Protocol::Udp) => TransportMut::Udp(UdpHeaderMut::new(segment)?),
            Some(Protocol::Icmp) => TransportMut::Icmp(IcmpHeaderMut::new(segment)?),
            None => TransportMut::Other(protocol),
        })
    }
}
