//! ICMP echo reply → UDP datagram

use super::metadata::{SmuggledPorts, METADATA_SIZE};
use super::{peek, resize_total, Conversion, Translation, HEADER_DELTA};
use crate::config::TranslatorConfig;
use crate::error::{Layer, TranslateError};
use crate::protocol::icmp::{IcmpType, ICMP_HEADER_SIZE};
use crate::protocol::ipv4::{Ipv4PacketMut, Protocol};
use crate::protocol::{Transport, TransportMut};

pub(super) fn icmp_to_udp(
    config: &TranslatorConfig,
    buffer: &mut [u8],
) -> Result<Translation, TranslateError> {
    if !matches!(peek(buffer), Some((protocol, _)) if protocol == Protocol::Icmp as u8) {
        return Ok(Translation::NotApplicable);
    }

    let mut packet = Ipv4PacketMut::new(buffer)?;
    if packet.segment().first() != Some(&(IcmpType::EchoReply as u8)) {
        return Ok(Translation::NotApplicable);
    }

    // Only the marker identifies a candidate, so a reply too short to carry
    // it is ordinary traffic
    let declared = packet.total_len();
    if declared < packet.header_len() + ICMP_HEADER_SIZE + METADATA_SIZE {
        return Ok(Translation::NotApplicable);
    }

    let Some((identifier, ports)) = inspect(config, &packet)? else {
        return Ok(Translation::NotApplicable);
    };

    let total = resize_total(declared, -HEADER_DELTA, packet.capacity())?;
    let src_addr = packet.src_addr();

    // Nothing has been written up to here.
    let TransportMut::Icmp(icmp) = packet
        .transport_mut()
        .map_err(|_| TranslateError::Header("ICMP segment unreadable"))?
    else {
        return Ok(Translation::NotApplicable);
    };

    // The pseudo-header already carries the final addresses
    let mut udp = icmp.into_udp(config.reply_src_port, identifier);
    udp.update_checksum(src_addr, config.trigger_addr);

    packet.set_dst_addr(config.trigger_addr);
    packet.set_protocol(Protocol::Udp);
    packet.set_total_length(total);
    packet.update_checksum();

    Ok(Translation::Converted(Conversion {
        destination: config.trigger_addr,
        correlation_port: identifier,
        original_dst_port: ports.dst_port,
        total_length: total,
    }))
}

/// Read-only checks on an ICMP packet. Returns the echo identifier and the
/// smuggled ports, or `None` when it is not a marked echo reply.
fn inspect(
    config: &TranslatorConfig,
    packet: &Ipv4PacketMut<'_>,
) -> Result<Option<(u16, SmuggledPorts)>, TranslateError> {
    let header = packet.header();

    let Transport::Icmp(icmp) = header
        .transport()
        .map_err(|_| TranslateError::Header("ICMP segment unreadable"))?
    else {
        return Ok(None);
    };
    if !icmp.is_echo_reply() {
        return Ok(None);
    }

    let ports = match SmuggledPorts::parse(icmp.payload()) {
        Some(ports) if ports.marker == config.magic => ports,
        _ => return Ok(None),
    };

    if config.verify_checksums {
        if !header.validate_checksum() {
            return Err(TranslateError::ChecksumMismatch { layer: Layer::Ipv4 });
        }
        if !icmp.validate_checksum() {
            return Err(TranslateError::ChecksumMismatch { layer: Layer::Icmp });
        }
    }

    Ok(Some((icmp.identifier(), ports)))
}
