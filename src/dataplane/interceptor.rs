//! Translator bound to the hook points

use super::hook::{PacketHook, Verdict};
use crate::telemetry::TranslationStats;
use crate::translate::{Direction, Translation, Translator};
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Runs the forward transform on outbound packets and the reverse transform
/// on inbound ones. Errors never reach the packet path: they are logged,
/// counted, and the packet goes through unmodified.
#[derive(Debug, Clone)]
pub struct Interceptor {
    translator: Translator,
    stats: Arc<TranslationStats>,
}

impl Interceptor {
    pub fn new(translator: Translator) -> Self {
        Self::with_stats(translator, Arc::new(TranslationStats::new()))
    }

    pub fn with_stats(translator: Translator, stats: Arc<TranslationStats>) -> Self {
        Self { translator, stats }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn stats(&self) -> &Arc<TranslationStats> {
        &self.stats
    }

    fn handle(&self, direction: Direction, buffer: &mut [u8]) -> Verdict {
        match self.translator.translate(direction, buffer) {
            Ok(Translation::Converted(conversion)) => {
                self.stats.record_converted(direction);
                match direction {
                    Direction::Outbound => info!(
                        "converted UDP to ICMP echo request for {} (id {})",
                        conversion.destination, conversion.correlation_port
                    ),
                    Direction::Inbound => info!(
                        "converted ICMP echo reply to UDP for port {}",
                        conversion.correlation_port
                    ),
                }
                Verdict::Modified
            }
            Ok(Translation::NotApplicable) => {
                self.stats.record_passthrough(direction);
                trace!("{} packet passed through ({} bytes)", direction, buffer.len());
                Verdict::Unmodified
            }
            Err(e) => {
                self.stats.record_error(&e);
                warn!("{} packet left unmodified: {}", direction, e);
                Verdict::Unmodified
            }
        }
    }
}

impl PacketHook for Interceptor {
    fn on_outbound(&self, buffer: &mut [u8]) -> Verdict {
        self.handle(Direction::Outbound, buffer)
    }

    fn on_inbound(&self, buffer: &mut [u8]) -> Verdict {
        self.handle(Direction::Inbound, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::protocol::icmp::{build_echo_reply, EchoRequestBuilder};
    use crate::protocol::ipv4::{Ipv4Builder, Protocol};
    use crate::protocol::udp::UdpBuilder;
    use crate::translate::{ProbeRequest, SmuggledPorts};
    use std::net::Ipv4Addr;

    const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const TARGET: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

    fn interceptor() -> Interceptor {
        Interceptor::new(Translator::new(TranslatorConfig::default()))
    }

    fn probe(payload: &[u8]) -> Vec<u8> {
        let trigger = TranslatorConfig::default().trigger_addr;
        let datagram = UdpBuilder::new()
            .src_port(40000)
            .dst_port(12345)
            .payload(payload)
            .build(CLIENT, trigger);
        Ipv4Builder::new()
            .src_addr(CLIENT)
            .dst_addr(trigger)
            .protocol(Protocol::Udp as u8)
            .payload(&datagram)
            .build()
    }

    #[test]
    fn test_outbound_probe_is_modified() {
        let hook = interceptor();
        let mut packet = probe(&ProbeRequest::new(TARGET, 0xDECAF).to_bytes());

        assert_eq!(hook.on_outbound(&mut packet), Verdict::Modified);
        assert_eq!(hook.stats().outbound_converted.get(), 1);
        assert_eq!(packet[9], Protocol::Icmp as u8);
    }

    #[test]
    fn test_inbound_reply_is_modified() {
        let hook = interceptor();
        let payload = SmuggledPorts {
            src_port: 40000,
            dst_port: 12345,
            marker: 0xDECAF,
        }
        .to_bytes();
        let reply = build_echo_reply(&EchoRequestBuilder::new(40000, 1).payload(&payload).build())
            .unwrap();
        let mut packet = Ipv4Builder::new()
            .src_addr(TARGET)
            .dst_addr(CLIENT)
            .protocol(Protocol::Icmp as u8)
            .payload(&reply)
            .build();

        assert!(hook.on_inbound(&mut packet).is_modified());
        assert_eq!(hook.stats().inbound_converted.get(), 1);
    }

    #[test]
    fn test_unrelated_traffic_passes_through() {
        let hook = interceptor();
        let mut packet = probe(b"not a probe");
        let before = packet.clone();

        assert_eq!(hook.on_outbound(&mut packet), Verdict::Unmodified);
        assert_eq!(hook.on_inbound(&mut packet), Verdict::Unmodified);
        assert_eq!(packet, before);
        assert_eq!(hook.stats().outbound_passthrough.get(), 1);
        assert_eq!(hook.stats().inbound_passthrough.get(), 1);
    }

    #[test]
    fn test_malformed_candidate_is_counted() {
        let hook = interceptor();
        let mut packet = probe(&[100, 100, 100]);
        let before = packet.clone();

        assert_eq!(hook.on_outbound(&mut packet), Verdict::Unmodified);
        assert_eq!(packet, before);
        assert_eq!(hook.stats().malformed.get(), 1);
    }

    #[test]
    fn test_shared_stats() {
        let stats = Arc::new(TranslationStats::new());
        let hook = Interceptor::with_stats(Translator::default(), Arc::clone(&stats));
        let mut packet = probe(&[100, 100, 100]);
        let mut runt = [0x45u8; 10];

        assert_eq!(hook.on_outbound(&mut packet), Verdict::Unmodified);
        assert_eq!(hook.on_outbound(&mut runt), Verdict::Unmodified);
        assert_eq!(stats.malformed.get(), 1);
        assert_eq!(stats.outbound_passthrough.get(), 1);
    }
}
