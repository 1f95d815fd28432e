//! Configuration management
//!
//! Handles udp2icmp.toml (user-defined) and udp2icmp.lock (generated with all
//! defaults, distributed to both ends of a deployment).

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Parse configuration from TOML text
pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Generate a lock file from config, filling in all defaults.
///
/// `source` is the text the config was parsed from; its SHA-256 is recorded
/// so a stale lock can be detected.
pub fn generate_lock(config: &Config, source: &str) -> ConfigLock {
    ConfigLock::from_config(config, source_hash(source))
}

/// Hex-encoded SHA-256 of the config source
pub fn source_hash(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}
