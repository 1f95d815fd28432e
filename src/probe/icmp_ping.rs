//! Raw ICMP ping for checking a target directly, bypassing the translator

use crate::capture::Capture;
use crate::config::PingConfig;
use crate::protocol::icmp::{EchoRequestBuilder, IcmpPacket, ICMP_HEADER_SIZE};
use crate::protocol::ipv4::{Ipv4Header, Protocol};
use crate::{Error, Result};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Bytes of the payload holding the send timestamp (microseconds, big-endian)
const TIMESTAMP_SIZE: usize = 8;

/// Echo request with a timestamp followed by an `A`..`Z` fill pattern
pub fn build_request(identifier: u16, sequence: u16, payload_size: usize, sent_at_us: i64) -> Vec<u8> {
    let mut payload = vec![0u8; payload_size.max(TIMESTAMP_SIZE)];
    payload[..TIMESTAMP_SIZE].copy_from_slice(&sent_at_us.to_be_bytes());
    for (i, byte) in payload.iter_mut().enumerate().skip(TIMESTAMP_SIZE) {
        *byte = b'A' + (i % 26) as u8;
    }

    EchoRequestBuilder::new(identifier, sequence)
        .payload(&payload)
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub source: Ipv4Addr,
    pub sequence: u16,
    /// ICMP message size
    pub bytes: usize,
    pub rtt: Duration,
}

/// Parse a received IPv4 packet as a reply to one of our requests.
///
/// `None` for anything else the raw socket hands us.
pub fn parse_reply(packet: &[u8], identifier: u16, now_us: i64) -> Option<EchoReply> {
    let ip = Ipv4Header::parse(packet).ok()?;
    if ip.protocol() != Protocol::Icmp as u8 {
        return None;
    }

    let icmp = IcmpPacket::parse(ip.payload()).ok()?;
    if !icmp.is_echo_reply() || icmp.identifier() != identifier {
        return None;
    }

    let stamp = icmp.payload().get(..TIMESTAMP_SIZE)?;
    let sent_at_us = i64::from_be_bytes(stamp.try_into().ok()?);
    let rtt_us = now_us.saturating_sub(sent_at_us).max(0) as u64;

    Some(EchoReply {
        source: ip.src_addr(),
        sequence: icmp.sequence(),
        bytes: icmp.as_bytes().len(),
        rtt: Duration::from_micros(rtt_us),
    })
}

/// Counters for one ping run, owned by the loop that updates them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingStats {
    pub sent: u64,
    pub received: u64,
}

impl PingStats {
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        100.0 * (self.sent - self.received.min(self.sent)) as f64 / self.sent as f64
    }

    pub fn summary(&self, destination: Ipv4Addr) -> String {
        format!(
            "--- {} ping statistics ---\n{} packets transmitted, {} received, {:.0}% packet loss",
            destination,
            self.sent,
            self.received,
            self.loss_percent()
        )
    }
}

fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// True when the process may open a raw socket without further privileges
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Echo request loop over a [`Capture`] backend
pub struct IcmpPinger<C: Capture> {
    socket: C,
    destination: Ipv4Addr,
    identifier: u16,
    config: PingConfig,
}

impl<C: Capture> IcmpPinger<C> {
    pub fn new(socket: C, destination: Ipv4Addr, config: PingConfig) -> Self {
        Self {
            socket,
            destination,
            identifier: std::process::id() as u16,
            config,
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Ping until `count` requests have been sent or `shutdown` resolves.
    pub async fn run<F>(&mut self, count: Option<u64>, shutdown: F) -> Result<PingStats>
    where
        F: Future,
    {
        tokio::pin!(shutdown);

        let mut stats = PingStats::default();
        let mut sequence: u16 = 1;

        println!(
            "PING {}: {} data bytes",
            self.destination, self.config.payload_size
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.ping_once(sequence, &mut stats) => result?,
            }

            if count.is_some_and(|n| stats.sent >= n) {
                break;
            }
            sequence = sequence.wrapping_add(1);

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }

        println!("\n{}", stats.summary(self.destination));
        Ok(stats)
    }

    async fn ping_once(&mut self, sequence: u16, stats: &mut PingStats) -> Result<()> {
        let request = build_request(self.identifier, sequence, self.config.payload_size, now_us());
        let sent = self.socket.send_to(&request, self.destination).await?;
        if sent != request.len() {
            return Err(Error::InvalidPacket(format!(
                "partial send: {} of {} bytes",
                sent,
                request.len()
            )));
        }
        stats.sent += 1;

        let deadline = Instant::now() + self.config.timeout();
        let mut buf = vec![0u8; ICMP_HEADER_SIZE + self.config.payload_size + 128];

        loop {
            let rx = match tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
                Ok(rx) => rx?,
                Err(_elapsed) => {
                    println!("Request timeout for icmp_seq {}", sequence);
                    return Ok(());
                }
            };

            match parse_reply(&buf[..rx.len], self.identifier, now_us()) {
                Some(reply) if reply.sequence == sequence => {
                    stats.received += 1;
                    println!(
                        "{} bytes from {}: icmp_seq={} time={:.2} ms",
                        reply.bytes,
                        reply.source,
                        reply.sequence,
                        reply.rtt.as_secs_f64() * 1000.0
                    );
                    return Ok(());
                }
                Some(reply) => warn!("late reply for icmp_seq {}", reply.sequence),
                None => debug!("ignoring {} bytes from {}", rx.len, rx.source),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RxInfo;
    use crate::protocol::icmp::build_echo_reply;
    use crate::protocol::ipv4::Ipv4Builder;
    use std::collections::VecDeque;

    const PEER: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    /// Answers every request with an echo reply; silent when `mute`
    struct EchoPeer {
        queue: VecDeque<Vec<u8>>,
        mute: bool,
    }

    impl EchoPeer {
        fn new(mute: bool) -> Self {
            Self {
                queue: VecDeque::new(),
                mute,
            }
        }
    }

    impl Capture for EchoPeer {
        async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
            match self.queue.pop_front() {
                Some(packet) => {
                    buf[..packet.len()].copy_from_slice(&packet);
                    Ok(RxInfo {
                        len: packet.len(),
                        source: PEER,
                    })
                }
                None => std::future::pending().await,
            }
        }

        async fn send_to(&mut self, buf: &[u8], dst: Ipv4Addr) -> Result<usize> {
            if !self.mute {
                let reply = build_echo_reply(buf)?;
                // Unrelated traffic arrives first
                let noise = build_echo_reply(&EchoRequestBuilder::new(1, 1).build())?;
                for message in [noise, reply] {
                    self.queue.push_back(
                        Ipv4Builder::new()
                            .src_addr(dst)
                            .dst_addr(LOCAL)
                            .protocol(Protocol::Icmp as u8)
                            .payload(&message)
                            .build(),
                    );
                }
            }
            Ok(buf.len())
        }
    }

    fn fast_config() -> PingConfig {
        PingConfig {
            payload_size: 56,
            interval_secs: 0,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_build_request_layout() {
        let request = build_request(0x1234, 7, 56, 1_000_000);
        let icmp = IcmpPacket::parse(&request).unwrap();

        assert_eq!(request.len(), 64);
        assert!(icmp.is_echo_request());
        assert!(icmp.validate_checksum());
        assert_eq!(icmp.sequence(), 7);
        assert_eq!(&icmp.payload()[..8], &1_000_000i64.to_be_bytes());
        assert_eq!(icmp.payload()[8], b'A' + 8);
        assert_eq!(icmp.payload()[26], b'A');
    }

    #[test]
    fn test_parse_reply_rtt() {
        let request = build_request(42, 3, 56, 5_000);
        let packet = Ipv4Builder::new()
            .src_addr(PEER)
            .dst_addr(LOCAL)
            .protocol(Protocol::Icmp as u8)
            .payload(&build_echo_reply(&request).unwrap())
            .build();

        let reply = parse_reply(&packet, 42, 7_500).unwrap();
        assert_eq!(reply.source, PEER);
        assert_eq!(reply.sequence, 3);
        assert_eq!(reply.bytes, 64);
        assert_eq!(reply.rtt, Duration::from_micros(2_500));

        assert!(parse_reply(&packet, 43, 7_500).is_none());
    }

    #[test]
    fn test_parse_reply_ignores_requests() {
        let packet = Ipv4Builder::new()
            .src_addr(PEER)
            .dst_addr(LOCAL)
            .protocol(Protocol::Icmp as u8)
            .payload(&build_request(42, 1, 56, 0))
            .build();
        assert!(parse_reply(&packet, 42, 0).is_none());
    }

    #[test]
    fn test_stats_loss() {
        let stats = PingStats {
            sent: 4,
            received: 3,
        };
        assert_eq!(stats.loss_percent(), 25.0);
        assert_eq!(PingStats::default().loss_percent(), 0.0);
        assert!(stats
            .summary(PEER)
            .ends_with("4 packets transmitted, 3 received, 25% packet loss"));
    }

    #[tokio::test]
    async fn test_run_counts_replies() {
        let mut pinger = IcmpPinger::new(EchoPeer::new(false), PEER, fast_config()).with_identifier(777);
        let stats = pinger
            .run(Some(3), std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats, PingStats { sent: 3, received: 3 });
    }

    #[tokio::test]
    async fn test_run_reports_timeouts() {
        let mut pinger = IcmpPinger::new(EchoPeer::new(true), PEER, fast_config());
        let stats = pinger
            .run(Some(1), std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats, PingStats { sent: 1, received: 0 });
        assert_eq!(stats.loss_percent(), 100.0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut pinger = IcmpPinger::new(EchoPeer::new(false), PEER, fast_config()).with_identifier(9);
        let stats = pinger.run(None, std::future::ready(())).await.unwrap();

        assert_eq!(stats.sent, 0);
    }
}
