//! UDP probe → ICMP echo request

use super::metadata::{ProbeRequest, SmuggledPorts, METADATA_SIZE};
use super::{peek, require_declared, resize_total, Conversion, Translation, HEADER_DELTA};
use crate::config::TranslatorConfig;
use crate::error::{Layer, TranslateError};
use crate::protocol::ipv4::{Ipv4PacketMut, Protocol};
use crate::protocol::udp::{UdpHeader, HEADER_SIZE as UDP_HEADER_SIZE};
use crate::protocol::{Transport, TransportMut};

/// Fields read from the probe before anything is written
struct Candidate {
    request: ProbeRequest,
    src_port: u16,
    dst_port: u16,
}

pub(super) fn udp_to_icmp(
    config: &TranslatorConfig,
    buffer: &mut [u8],
) -> Result<Translation, TranslateError> {
    let addressed = peek(buffer).is_some_and(|(protocol, dst)| {
        protocol == Protocol::Udp as u8 && dst == config.trigger_addr
    });
    if !addressed {
        return Ok(Translation::NotApplicable);
    }

    // Addressed to the trigger: from here on a bad structure is an error
    let mut packet = Ipv4PacketMut::new(buffer)?;

    let header_len = packet.header_len();
    let declared = packet.total_len();
    require_declared(header_len + UDP_HEADER_SIZE + METADATA_SIZE, declared)?;

    let Some(candidate) = inspect(config, &packet)? else {
        return Ok(Translation::NotApplicable);
    };

    let total = resize_total(declared, HEADER_DELTA, packet.capacity())?;

    // Nothing has been written up to here.
    let TransportMut::Udp(udp) = packet
        .transport_mut()
        .map_err(|_| TranslateError::Header("UDP segment unreadable"))?
    else {
        return Ok(Translation::NotApplicable);
    };

    let mut icmp = udp.into_icmp_echo(candidate.src_port, config.echo_sequence);
    SmuggledPorts {
        src_port: candidate.src_port,
        dst_port: candidate.dst_port,
        marker: config.magic,
    }
    .write(icmp.payload_mut());
    icmp.update_checksum();

    packet.set_dst_addr(candidate.request.target);
    packet.set_protocol(Protocol::Icmp);
    packet.set_total_length(total);
    packet.update_checksum();

    Ok(Translation::Converted(Conversion {
        destination: candidate.request.target,
        correlation_port: candidate.src_port,
        original_dst_port: candidate.dst_port,
        total_length: total,
    }))
}

/// Read-only checks on a UDP packet to the trigger address.
///
/// `Ok(None)` when the marker does not match.
fn inspect(
    config: &TranslatorConfig,
    packet: &Ipv4PacketMut<'_>,
) -> Result<Option<Candidate>, TranslateError> {
    let header = packet.header();
    let declared = packet.total_len();

    let Transport::Udp(udp) = header
        .transport()
        .map_err(|_| TranslateError::Header("UDP segment unreadable"))?
    else {
        return Ok(None);
    };

    let request = match ProbeRequest::parse(udp.payload()) {
        Some(request) if request.marker == config.magic => request,
        _ => return Ok(None),
    };

    // The UDP length must cover the metadata and stay inside the IP packet
    let udp_len = udp.length() as usize;
    let segment = header.payload();
    require_declared(UDP_HEADER_SIZE + METADATA_SIZE, udp_len).map_err(|_| {
        TranslateError::Truncated {
            needed: header.header_len() + UDP_HEADER_SIZE + METADATA_SIZE,
            declared: header.header_len() + udp_len,
        }
    })?;
    require_declared(header.header_len() + udp_len, declared)?;

    if config.verify_checksums {
        if !header.validate_checksum() {
            return Err(TranslateError::ChecksumMismatch { layer: Layer::Ipv4 });
        }
        let datagram = UdpHeader::parse(&segment[..udp_len])
            .map_err(|_| TranslateError::Header("UDP segment unreadable"))?;
        if !datagram.validate_checksum(header.src_addr(), header.dst_addr()) {
            return Err(TranslateError::ChecksumMismatch { layer: Layer::Udp });
        }
    }

    Ok(Some(Candidate {
        request,
        src_port: udp.src_port(),
        dst_port: udp.dst_port(),
    }))
}
