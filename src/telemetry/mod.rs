//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Counters for translation outcomes

mod logging;
mod metrics;

pub use logging::{init_logging, is_known_format, is_known_level, LogConfig};
pub use metrics::{Counter, TranslationStats};
