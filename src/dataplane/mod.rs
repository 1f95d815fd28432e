//! Data plane components
//!
//! Hook points on the transmit and receive paths hand each packet to the
//! translator and get back a verdict.

mod hook;
mod interceptor;

pub use hook::{PacketHook, Verdict};
pub use interceptor::Interceptor;
