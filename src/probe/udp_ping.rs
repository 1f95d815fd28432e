//! UDP probe through the translator
//!
//! Sends a [`ProbeRequest`] to the trigger address and waits for the
//! translated echo reply to come back as UDP.

use crate::config::{ProbeConfig, TranslatorConfig};
use crate::translate::metadata::{self, ProbeRequest, METADATA_SIZE};
use crate::{Error, Result};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Reply carried the marker
    Passed { rtt: Duration },
    MagicMismatch { expected: u32, got: u32 },
    SizeMismatch { expected: usize, got: usize },
    /// Nothing arrived within the timeout
    Timeout,
}

impl ProbeOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ProbeOutcome::Passed { .. })
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Passed { rtt } => write!(
                f,
                "Congrats: test passed\nResponse received in {:.2} ms",
                rtt.as_secs_f64() * 1000.0
            ),
            ProbeOutcome::MagicMismatch { expected, got } => write!(
                f,
                "Warning: Response received but magic number mismatch\nExpected: {:#X}, Got: {:#X}",
                expected, got
            ),
            ProbeOutcome::SizeMismatch { expected, got } => write!(
                f,
                "Warning: Response received but size mismatch\nExpected: {} bytes, Got: {} bytes",
                expected, got
            ),
            ProbeOutcome::Timeout => write!(f, "Timeout: No response received"),
        }
    }
}

/// Classify a reply payload. The marker is read at bytes 4..8.
pub fn evaluate_reply(reply: &[u8], magic: u32, rtt: Duration) -> ProbeOutcome {
    match metadata::marker(reply) {
        None => ProbeOutcome::SizeMismatch {
            expected: METADATA_SIZE,
            got: reply.len(),
        },
        Some(got) if got != magic => ProbeOutcome::MagicMismatch {
            expected: magic,
            got,
        },
        Some(_) => ProbeOutcome::Passed { rtt },
    }
}

/// Send one probe for `target` and wait for the reply.
///
/// Socket errors are returned; a missing reply is [`ProbeOutcome::Timeout`].
pub async fn udp_ping(
    probe: &ProbeConfig,
    translator: &TranslatorConfig,
    target: Ipv4Addr,
) -> Result<ProbeOutcome> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, probe.client_port))
        .await
        .map_err(Error::Io)?;

    let server = SocketAddrV4::new(translator.trigger_addr, probe.server_port);
    let request = ProbeRequest::new(target, translator.magic).to_bytes();

    let start = Instant::now();
    let sent = socket.send_to(&request, server).await.map_err(Error::Io)?;
    if sent != request.len() {
        return Err(Error::InvalidPacket(format!(
            "partial send: {} of {} bytes",
            sent,
            request.len()
        )));
    }
    debug!("probe for {} sent to {}", target, server);

    let mut buf = [0u8; 1024];
    let (len, from) = match tokio::time::timeout(probe.timeout(), socket.recv_from(&mut buf)).await
    {
        Ok(received) => received.map_err(Error::Io)?,
        Err(_elapsed) => return Ok(ProbeOutcome::Timeout),
    };
    let rtt = start.elapsed();
    debug!("{} byte reply from {}", len, from);

    Ok(evaluate_reply(&buf[..len], translator.magic, rtt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_passed() {
        let reply = [0xD4, 0x31, 0x30, 0x39, 0x00, 0x0D, 0xEC, 0xAF];
        let rtt = Duration::from_micros(1500);
        assert_eq!(
            evaluate_reply(&reply, 0xDECAF, rtt),
            ProbeOutcome::Passed { rtt }
        );
    }

    #[test]
    fn test_evaluate_magic_mismatch() {
        let reply = [0, 0, 0, 0, 0x00, 0x0B, 0xEE, 0xF0];
        assert_eq!(
            evaluate_reply(&reply, 0xDECAF, Duration::ZERO),
            ProbeOutcome::MagicMismatch {
                expected: 0xDECAF,
                got: 0xBEEF0
            }
        );
    }

    #[test]
    fn test_evaluate_size_mismatch() {
        assert_eq!(
            evaluate_reply(&[1, 2, 3], 0xDECAF, Duration::ZERO),
            ProbeOutcome::SizeMismatch {
                expected: 8,
                got: 3
            }
        );
    }

    #[test]
    fn test_outcome_display() {
        let passed = ProbeOutcome::Passed {
            rtt: Duration::from_micros(2340),
        };
        assert_eq!(
            passed.to_string(),
            "Congrats: test passed\nResponse received in 2.34 ms"
        );
        assert!(ProbeOutcome::MagicMismatch {
            expected: 0xDECAF,
            got: 1
        }
        .to_string()
        .contains("Expected: 0xDECAF, Got: 0x1"));
    }

    async fn local_server() -> (UdpSocket, u16) {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        (server, port)
    }

    fn local_configs(server_port: u16, timeout_secs: u64) -> (ProbeConfig, TranslatorConfig) {
        let probe = ProbeConfig {
            server_port,
            client_port: 0,
            timeout_secs,
        };
        let translator = TranslatorConfig {
            trigger_addr: Ipv4Addr::LOCALHOST,
            ..TranslatorConfig::default()
        };
        (probe, translator)
    }

    #[tokio::test]
    async fn test_udp_ping_against_echo_server() {
        let (server, port) = local_server().await;
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..len], peer).await.unwrap();
        });

        let (probe, translator) = local_configs(port, 5);
        let outcome = udp_ping(&probe, &translator, Ipv4Addr::new(142, 251, 43, 100))
            .await
            .unwrap();
        assert!(outcome.is_passed(), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_udp_ping_times_out() {
        // Bound but silent
        let (_server, port) = local_server().await;

        let (probe, translator) = local_configs(port, 1);
        let outcome = udp_ping(&probe, &translator, Ipv4Addr::new(10, 0, 0, 1))
            .await
            .unwrap();
        assert_eq!(outcome, ProbeOutcome::Timeout);
    }
}
