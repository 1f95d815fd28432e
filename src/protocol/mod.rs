//! Packet views and checksums for the protocols the translator touches.

pub mod checksum;
pub mod icmp;
pub mod ipv4;
pub mod transport;
pub mod udp;

pub use checksum::{checksum, ChecksumSpan, PseudoHeader};
pub use transport::{Transport, TransportMut};
