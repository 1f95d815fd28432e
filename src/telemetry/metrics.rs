//! Translation counters.
//!
//! Owned by the hook adapter and shared by reference; there are no
//! process-wide counters.

use crate::error::TranslateError;
use crate::translate::Direction;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome counts for every packet handed to the translator.
#[derive(Debug, Default)]
pub struct TranslationStats {
    /// UDP probes rewritten as echo requests.
    pub outbound_converted: Counter,
    /// Echo replies rewritten as UDP.
    pub inbound_converted: Counter,
    pub outbound_passthrough: Counter,
    pub inbound_passthrough: Counter,
    /// Truncated or structurally invalid candidates.
    pub malformed: Counter,
    pub checksum_failures: Counter,
    pub capacity_overflows: Counter,
}

impl TranslationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_converted(&self, direction: Direction) {
        match direction {
            Direction::Outbound => self.outbound_converted.inc(),
            Direction::Inbound => self.inbound_converted.inc(),
        }
    }

    pub fn record_passthrough(&self, direction: Direction) {
        match direction {
            Direction::Outbound => self.outbound_passthrough.inc(),
            Direction::Inbound => self.inbound_passthrough.inc(),
        }
    }

    pub fn record_error(&self, error: &TranslateError) {
        match error {
            TranslateError::ChecksumMismatch { .. } => self.checksum_failures.inc(),
            TranslateError::CapacityOverflow { .. } => self.capacity_overflows.inc(),
            TranslateError::Header(_) | TranslateError::Truncated { .. } => self.malformed.inc(),
        }
    }

    /// Exports all counters as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("outbound_converted".into(), self.outbound_converted.get()),
            ("inbound_converted".into(), self.inbound_converted.get()),
            ("outbound_passthrough".into(), self.outbound_passthrough.get()),
            ("inbound_passthrough".into(), self.inbound_passthrough.get()),
            ("malformed".into(), self.malformed.get()),
            ("checksum_failures".into(), self.checksum_failures.get()),
            ("capacity_overflows".into(), self.capacity_overflows.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Layer;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_direction_counters() {
        let stats = TranslationStats::new();

        stats.record_converted(Direction::Outbound);
        stats.record_converted(Direction::Inbound);
        stats.record_converted(Direction::Inbound);
        stats.record_passthrough(Direction::Outbound);

        assert_eq!(stats.outbound_converted.get(), 1);
        assert_eq!(stats.inbound_converted.get(), 2);
        assert_eq!(stats.outbound_passthrough.get(), 1);
        assert_eq!(stats.inbound_passthrough.get(), 0);
    }

    #[test]
    fn test_error_classification() {
        let stats = TranslationStats::new();

        stats.record_error(&TranslateError::Header("IHL below minimum"));
        stats.record_error(&TranslateError::Truncated {
            needed: 36,
            declared: 30,
        });
        stats.record_error(&TranslateError::ChecksumMismatch { layer: Layer::Udp });
        stats.record_error(&TranslateError::CapacityOverflow {
            required: 40,
            capacity: 36,
        });

        let metrics = stats.export();
        assert!(metrics.contains(&("malformed".into(), 2)));
        assert!(metrics.contains(&("checksum_failures".into(), 1)));
        assert!(metrics.contains(&("capacity_overflows".into(), 1)));
        assert_eq!(metrics.len(), 7);
    }
}
