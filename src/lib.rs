//! udp2icmp - UDP ⇄ ICMP echo translation
//!
//! Rewrites UDP probes addressed to a trigger address into ICMP echo requests
//! for the target they name, and rewrites the matching echo replies back into
//! UDP. Every rewrite happens in place in a caller-owned buffer.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod telemetry;
pub mod translate;

pub use error::{Error, Result, TranslateError};
pub use translate::{Conversion, Direction, Translation, Translator};
