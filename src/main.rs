use clap::{Parser, Subcommand, ValueEnum};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use udp2icmp::capture::RawIcmpSocket;
use udp2icmp::config::{self, Config};
use udp2icmp::dataplane::{Interceptor, PacketHook};
use udp2icmp::probe::{icmp_ping, udp_ping, IcmpPinger, ProbeOutcome};
use udp2icmp::telemetry::init_logging;
use udp2icmp::translate::{Direction, Translator};

const DEFAULT_CONFIG: &str = "udp2icmp.toml";

#[derive(Parser)]
#[command(name = "udp2icmp")]
#[command(about = "UDP to ICMP echo translation and probe tools")]
struct Cli {
    /// Path to udp2icmp.toml (or a generated lock file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a UDP probe through the translator and wait for the reply
    Probe {
        /// Address the translator should ping
        target: Ipv4Addr,
    },
    /// Ping a host directly over a raw ICMP socket (requires root)
    Ping {
        destination: Ipv4Addr,

        /// Stop after sending this many requests
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
    /// Run one hex-encoded IPv4 packet through the translator
    Translate {
        #[arg(short, long, value_enum, default_value = "outbound")]
        direction: HookPoint,

        /// Packet bytes as hex; extra trailing bytes are spare capacity
        packet: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HookPoint {
    Outbound,
    Inbound,
}

impl From<HookPoint> for Direction {
    fn from(point: HookPoint) -> Self {
        match point {
            HookPoint::Outbound => Direction::Outbound,
            HookPoint::Inbound => Direction::Inbound,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate udp2icmp.lock from udp2icmp.toml
    Generate {
        /// Output path for the lock file
        #[arg(short, long, default_value = "udp2icmp.lock")]
        output: PathBuf,
    },
    /// Validate udp2icmp.toml without generating a lock file
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { action } => {
            init_logging(None);
            let config_path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            match action {
                ConfigAction::Generate { output } => cmd_config_generate(&config_path, &output),
                ConfigAction::Validate => cmd_config_validate(&config_path),
            }
        }
        Commands::Probe { target } => {
            with_config(cli.config.as_deref(), |cfg| cmd_probe(cfg, target))
        }
        Commands::Ping { destination, count } => {
            with_config(cli.config.as_deref(), |cfg| cmd_ping(cfg, destination, count))
        }
        Commands::Translate { direction, packet } => {
            with_config(cli.config.as_deref(), |cfg| {
                cmd_translate(cfg, direction.into(), &packet)
            })
        }
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

/// Load the config, start logging with its settings, then run `command`
fn with_config<F>(path: Option<&Path>, command: F) -> Result<(), String>
where
    F: FnOnce(&Config) -> Result<(), String>,
{
    let cfg = load_config(path)?;
    init_logging(Some(&cfg.logging()));
    command(&cfg)
}

/// An explicit path must exist; the default path is optional
fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => return Ok(Config::default()),
    };

    let cfg = config::load(path).map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
    let validation = config::validate(&cfg);
    if validation.has_errors() {
        validation.print_diagnostics();
        return Err(format!("Invalid configuration in {}", path.display()));
    }
    Ok(cfg)
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))
}

fn cmd_probe(cfg: &Config, target: Ipv4Addr) -> Result<(), String> {
    let probe = cfg.probe();
    let translator = cfg.translator();

    println!("UDP echo: {}", target);
    debug!(
        "sending to {}:{} from port {}",
        translator.trigger_addr, probe.server_port, probe.client_port
    );

    let outcome = runtime()?
        .block_on(udp_ping(&probe, &translator, target))
        .map_err(|e| format!("Probe failed: {}", e))?;

    match outcome {
        ProbeOutcome::Timeout => Err(format!(
            "Timeout: No response received within {} seconds",
            probe.timeout_secs
        )),
        outcome => {
            println!("{}", outcome);
            Ok(())
        }
    }
}

fn cmd_ping(cfg: &Config, destination: Ipv4Addr, count: Option<u64>) -> Result<(), String> {
    if !icmp_ping::is_root() {
        return Err("This command requires root privileges; run it with sudo".to_string());
    }

    runtime()?.block_on(async {
        let socket = RawIcmpSocket::open().map_err(|e| format!("Failed to open raw socket: {}", e))?;
        let mut pinger = IcmpPinger::new(socket, destination, cfg.ping());
        info!("pinging {} with identifier {}", destination, pinger.identifier());

        pinger
            .run(count, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map(|_| ())
            .map_err(|e| format!("Ping failed: {}", e))
    })
}

fn cmd_translate(cfg: &Config, direction: Direction, packet: &str) -> Result<(), String> {
    let mut buffer = decode_hex(packet)?;
    let interceptor = Interceptor::new(Translator::new(cfg.translator()));

    let verdict = match direction {
        Direction::Outbound => interceptor.on_outbound(&mut buffer),
        Direction::Inbound => interceptor.on_inbound(&mut buffer),
    };

    let total_len = match buffer.get(2..4) {
        Some(field) => (u16::from_be_bytes([field[0], field[1]]) as usize).min(buffer.len()),
        None => buffer.len(),
    };

    println!("{:?}", verdict);
    println!("{}", hex::encode(&buffer[..total_len]));
    for (name, value) in interceptor.stats().export() {
        if value > 0 {
            debug!("{} = {}", name, value);
        }
    }
    Ok(())
}

/// Whitespace between digits is ignored
fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&digits).map_err(|e| format!("Invalid hex packet: {}", e))
}

fn cmd_config_generate(config_path: &Path, output_path: &Path) -> Result<(), String> {
    println!("[INFO] Loading {}...", config_path.display());

    let content = std::fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    let cfg = config::parse(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        return Err("Validation failed with errors".to_string());
    }

    let lock = config::generate_lock(&cfg, &content);

    let lock_toml =
        toml::to_string_pretty(&lock).map_err(|e| format!("Failed to serialize lock: {}", e))?;

    let output = format!(
        "# Generated by udp2icmp - DO NOT EDIT\n# Source: {} (sha256: {})\n\n{}",
        config_path.display(),
        &lock.source_hash[..16],
        lock_toml
    );

    std::fs::write(output_path, output).map_err(|e| format!("Failed to write lock file: {}", e))?;

    println!("[INFO] Generated {}", output_path.display());
    Ok(())
}

fn cmd_config_validate(config_path: &Path) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!("[INFO] Configuration is valid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_ignores_whitespace() {
        assert_eq!(decode_hex("45 00\n00 24").unwrap(), vec![0x45, 0x00, 0x00, 0x24]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_hex_rejects_bad_input() {
        assert!(decode_hex("450").is_err());
        assert!(decode_hex("4g").is_err());
        assert!(decode_hex("é1").is_err());
    }
}
