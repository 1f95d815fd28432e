use std::fmt;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("translation failed: {0}")]
    Translate(#[from] TranslateError),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Header layer whose checksum failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Ipv4,
    Udp,
    Icmp,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Ipv4 => write!(f, "IPv4"),
            Layer::Udp => write!(f, "UDP"),
            Layer::Icmp => write!(f, "ICMP"),
        }
    }
}

/// Translation failures. The buffer is never modified when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("malformed IPv4 header: {0}")]
    Header(&'static str),

    #[error("packet truncated: need {needed} bytes, declared {declared}")]
    Truncated { needed: usize, declared: usize },

    #[error("{layer} checksum mismatch")]
    ChecksumMismatch { layer: Layer },

    #[error("rewritten packet needs {required} bytes, buffer holds {capacity}")]
    CapacityOverflow { required: usize, capacity: usize },
}

impl TranslateError {
    /// Malformed input as opposed to a capacity problem
    pub fn is_malformed(&self) -> bool {
        !matches!(self, TranslateError::CapacityOverflow { .. })
    }
}
