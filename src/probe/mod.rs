//! Probe tools
//!
//! - `udp_ping`: end-to-end check through a translating host
//! - `icmp_ping`: plain raw-socket ping of a target, for debugging

pub mod icmp_ping;
pub mod udp_ping;

pub use icmp_ping::{EchoReply, IcmpPinger, PingStats};
pub use udp_ping::{evaluate_reply, udp_ping, ProbeOutcome};
