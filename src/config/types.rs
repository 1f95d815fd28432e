//! Configuration types

use crate::telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Address probes are sent to in order to request translation
pub const DEFAULT_TRIGGER_ADDR: Ipv4Addr = Ipv4Addr::new(100, 100, 100, 100);
/// Marker authorizing translation (20-bit value)
pub const DEFAULT_MAGIC: u32 = 0xDECAF;
/// Source port written on reconstructed UDP replies
pub const DEFAULT_REPLY_SRC_PORT: u16 = 53;
/// Sequence number on translated echo requests
pub const DEFAULT_ECHO_SEQUENCE: u16 = 1;
pub const DEFAULT_SERVER_PORT: u16 = 12345;
pub const DEFAULT_CLIENT_PORT: u16 = 54321;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// 64-byte echo message minus the 8-byte header
pub const DEFAULT_PING_PAYLOAD: usize = 56;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 1;

/// User-defined configuration (udp2icmp.toml)
///
/// Every key is optional. A generated lock file also parses as a `Config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translator: TranslatorSection,
    #[serde(default)]
    pub probe: ProbeSection,
    #[serde(default)]
    pub ping: PingSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslatorSection {
    pub trigger_addr: Option<Ipv4Addr>,
    pub magic: Option<u32>,
    pub reply_src_port: Option<u16>,
    pub echo_sequence: Option<u16>,
    pub verify_checksums: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeSection {
    pub server_port: Option<u16>,
    pub client_port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingSection {
    pub payload_size: Option<usize>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

// ============================================================================
// Resolved types (all defaults applied)
// ============================================================================

/// Constants shared by both ends of a deployment. Fixed once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub trigger_addr: Ipv4Addr,
    pub magic: u32,
    pub reply_src_port: u16,
    pub echo_sequence: u16,
    pub verify_checksums: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            trigger_addr: DEFAULT_TRIGGER_ADDR,
            magic: DEFAULT_MAGIC,
            reply_src_port: DEFAULT_REPLY_SRC_PORT,
            echo_sequence: DEFAULT_ECHO_SEQUENCE,
            verify_checksums: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub server_port: u16,
    pub client_port: u16,
    pub timeout_secs: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            client_port: DEFAULT_CLIENT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingConfig {
    pub payload_size: usize,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl PingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            payload_size: DEFAULT_PING_PAYLOAD,
            interval_secs: DEFAULT_PING_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn translator(&self) -> TranslatorConfig {
        let section = &self.translator;
        let defaults = TranslatorConfig::default();
        TranslatorConfig {
            trigger_addr: section.trigger_addr.unwrap_or(defaults.trigger_addr),
            magic: section.magic.unwrap_or(defaults.magic),
            reply_src_port: section.reply_src_port.unwrap_or(defaults.reply_src_port),
            echo_sequence: section.echo_sequence.unwrap_or(defaults.echo_sequence),
            verify_checksums: section.verify_checksums.unwrap_or(defaults.verify_checksums),
        }
    }

    pub fn probe(&self) -> ProbeConfig {
        let section = &self.probe;
        ProbeConfig {
            server_port: section.server_port.unwrap_or(DEFAULT_SERVER_PORT),
            client_port: section.client_port.unwrap_or(DEFAULT_CLIENT_PORT),
            timeout_secs: section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn ping(&self) -> PingConfig {
        let section = &self.ping;
        PingConfig {
            payload_size: section.payload_size.unwrap_or(DEFAULT_PING_PAYLOAD),
            interval_secs: section.interval_secs.unwrap_or(DEFAULT_PING_INTERVAL_SECS),
            timeout_secs: section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn logging(&self) -> LogConfig {
        let defaults = LogConfig::new();
        LogConfig {
            level: self.logging.level.clone().unwrap_or(defaults.level),
            format: self.logging.format.clone().unwrap_or(defaults.format),
        }
    }
}

// ============================================================================
// Lock file types (generated, includes all defaults)
// ============================================================================

/// Generated lock file with all defaults filled in.
///
/// Distributed to both ends so they agree on the translator constants.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigLock {
    pub generated_at: String,
    pub source_hash: String,
    pub translator: TranslatorConfig,
    pub probe: ProbeConfig,
    pub ping: PingConfig,
    pub logging: LogConfig,
}

impl ConfigLock {
    pub fn from_config(config: &Config, source_hash: String) -> Self {
        ConfigLock {
            generated_at: chrono::Utc::now().to_rfc3339(),
            source_hash,
            translator: config.translator(),
            probe: config.probe(),
            ping: config.ping(),
            logging: config.logging(),
        }
    }
}
