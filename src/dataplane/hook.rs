//! Hook contract between the packet path and the translator

/// Result of handing a packet to a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// The buffer was rewritten; its length field and checksums are valid
    Modified,
    /// The buffer is byte-for-byte what was passed in
    #[default]
    Unmodified,
}

impl Verdict {
    pub fn is_modified(&self) -> bool {
        matches!(self, Verdict::Modified)
    }
}

/// Called once per packet at each hook point.
///
/// The buffer is borrowed exclusively for the call; its length is the
/// capacity available for the rewritten packet. Implementations must leave it
/// self-consistent whichever verdict they return.
pub trait PacketHook: Send + Sync {
    /// Transmit path
    fn on_outbound(&self, buffer: &mut [u8]) -> Verdict;

    /// Receive path
    fn on_inbound(&self, buffer: &mut [u8]) -> Verdict;
}
