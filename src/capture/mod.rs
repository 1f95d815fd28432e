//! Packet I/O backends
//!
//! The ping tool talks to the network through the [`Capture`] trait so its
//! loop can run against the raw ICMP socket or an in-memory peer.

mod raw_icmp;

pub use raw_icmp::RawIcmpSocket;

use crate::Result;
use std::future::Future;
use std::net::Ipv4Addr;

/// Information about a received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInfo {
    /// Number of bytes received
    pub len: usize,
    /// Sender address
    pub source: Ipv4Addr,
}

/// Packet I/O backend trait
pub trait Capture: Send + Sync {
    /// Receive an IPv4 packet (header included) into the provided buffer
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;

    /// Send a transport message; the backend supplies the IPv4 header
    fn send_to(&mut self, buf: &[u8], dst: Ipv4Addr) -> impl Future<Output = Result<usize>> + Send;
}
