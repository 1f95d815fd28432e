//! Configuration validation

use super::Config;
use crate::telemetry::{is_known_format, is_known_level};

/// Largest UDP payload over IPv4 (65535 - 20 - 8)
const MAX_UDP_PAYLOAD: usize = 65507;
/// Ping payloads start with an 8-byte send timestamp
const PING_TIMESTAMP_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_translator(config, &mut result);
    validate_probe(config, &mut result);
    validate_ping(config, &mut result);
    validate_logging(config, &mut result);

    result
}

fn validate_translator(config: &Config, result: &mut ValidationResult) {
    let translator = config.translator();

    if translator.magic == 0 {
        result.error("translator.magic: marker must be nonzero");
    } else if translator.magic > 0xF_FFFF {
        result.warn(format!(
            "translator.magic: {:#x} is wider than 20 bits",
            translator.magic
        ));
    }

    let trigger = translator.trigger_addr;
    if trigger.is_unspecified() || trigger.is_broadcast() || trigger.is_multicast() {
        result.error(format!(
            "translator.trigger_addr: {} is not a unicast address",
            trigger
        ));
    }

    if translator.reply_src_port == config.probe().client_port {
        result.warn(format!(
            "translator.reply_src_port: {} equals probe.client_port",
            translator.reply_src_port
        ));
    }
}

fn validate_probe(config: &Config, result: &mut ValidationResult) {
    let probe = config.probe();

    if probe.server_port == 0 {
        result.error("probe.server_port: must be nonzero");
    }
    if probe.client_port == 0 {
        result.warn("probe.client_port: 0 binds an ephemeral port");
    }
    if probe.timeout_secs == 0 {
        result.error("probe.timeout_secs: must be nonzero");
    }
}

fn validate_ping(config: &Config, result: &mut ValidationResult) {
    let ping = config.ping();

    if ping.payload_size < PING_TIMESTAMP_SIZE {
        result.error(format!(
            "ping.payload_size: {} is shorter than the {}-byte timestamp",
            ping.payload_size, PING_TIMESTAMP_SIZE
        ));
    } else if ping.payload_size > MAX_UDP_PAYLOAD - PING_TIMESTAMP_SIZE {
        result.error(format!(
            "ping.payload_size: {} exceeds {}",
            ping.payload_size,
            MAX_UDP_PAYLOAD - PING_TIMESTAMP_SIZE
        ));
    }

    if ping.timeout_secs == 0 {
        result.error("ping.timeout_secs: must be nonzero");
    }
    if ping.interval_secs == 0 {
        result.warn("ping.interval_secs: 0 sends requests back to back");
    }
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    if let Some(level) = &config.logging.level {
        if !is_known_level(level) {
            result.warn(format!("logging.level: unknown level '{}', using info", level));
        }
    }
    if let Some(format) = &config.logging.format {
        if !is_known_format(format) {
            result.warn(format!(
                "logging.format: unknown format '{}', using pretty",
                format
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn make_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_valid_default_config() {
        let result = validate(&make_config());
        assert!(!result.has_errors());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_zero_magic() {
        let mut config = make_config();
        config.translator.magic = Some(0);
        let result = validate(&config);
        assert!(result.has_errors());
        assert!(result.errors.iter().any(|e| e.contains("nonzero")));
    }

    #[test]
    fn test_wide_magic_warns() {
        let mut config = make_config();
        config.translator.magic = Some(0x1234_5678);
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("20 bits")));
    }

    #[test]
    fn test_trigger_must_be_unicast() {
        for addr in [
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::BROADCAST,
            Ipv4Addr::new(224, 0, 0, 1),
        ] {
            let mut config = make_config();
            config.translator.trigger_addr = Some(addr);
            let result = validate(&config);
            assert!(
                result.errors.iter().any(|e| e.contains("not a unicast")),
                "{} accepted",
                addr
            );
        }
    }

    #[test]
    fn test_reply_port_collides_with_client_port() {
        let mut config = make_config();
        config.translator.reply_src_port = Some(4000);
        config.probe.client_port = Some(4000);
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("equals probe.client_port")));
    }

    #[test]
    fn test_probe_ports_and_timeout() {
        let mut config = make_config();
        config.probe.server_port = Some(0);
        config.probe.client_port = Some(0);
        config.probe.timeout_secs = Some(0);
        let result = validate(&config);
        assert_eq!(result.errors.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("ephemeral")));
    }

    #[test]
    fn test_ping_payload_bounds() {
        let mut config = make_config();
        config.ping.payload_size = Some(4);
        assert!(validate(&config)
            .errors
            .iter()
            .any(|e| e.contains("timestamp")));

        config.ping.payload_size = Some(65500);
        assert!(validate(&config).errors.iter().any(|e| e.contains("exceeds")));

        config.ping.payload_size = Some(65499);
        assert!(!validate(&config).has_errors());
    }

    #[test]
    fn test_unknown_logging_settings_warn() {
        let mut config = make_config();
        config.logging.level = Some("verbose".into());
        config.logging.format = Some("xml".into());
        let result = validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 2);
    }
}
