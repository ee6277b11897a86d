//! In-process ICMP tracer bound to one enumerated device.
//!
//! Echo requests go out over the raw ICMPv4 channel from
//! [`crate::network::transport`] with an increasing TTL. Routers on the path
//! answer with *time exceeded*, the target with an *echo reply*. Probes are
//! told apart by the identifier chosen per trace and the sequence number,
//! which carries the TTL.
//!
//! The kernel routes the probes; the bound device is what the user selected
//! and what the tracer reports as its source.

use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::transport::icmp_packet_iter;
use tracing::{debug, trace};
use vtrace_common::NetworkDevice;

use super::Hop;
use crate::network::transport;

const ECHO_PAYLOAD: &[u8; 32] = b"vtrace-probe-abcdefghijklmnopqrs";
/// ICMP header (type, code, checksum) plus the unused word of error messages.
const ICMP_ERROR_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedTracer {
    device: NetworkDevice,
}

/// What an incoming ICMP message says about one of our probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeReply {
    /// A router on the path dropped the probe with this sequence number.
    Transit(u16),
    /// The target answered the probe.
    Arrived(u16),
    /// The target or a router refused the probe.
    Unreachable(u16),
}

impl ProbeReply {
    pub fn sequence(self) -> u16 {
        match self {
            ProbeReply::Transit(seq) | ProbeReply::Arrived(seq) | ProbeReply::Unreachable(seq) => {
                seq
            }
        }
    }
}

impl EmbeddedTracer {
    pub fn bind(device: NetworkDevice) -> Self {
        debug!(device = %device.name(), "embedded tracer bound");
        Self { device }
    }

    pub fn device(&self) -> &NetworkDevice {
        &self.device
    }

    pub(super) fn dispose(&mut self) {
        debug!(device = %self.device.name(), "embedded tracer released");
    }

    /// Traces the route to `target`, one probe per TTL. Blocks.
    pub fn trace(&self, target: Ipv4Addr, max_hops: u8, timeout: Duration) -> anyhow::Result<Vec<Hop>> {
        let (mut tx, mut rx) =
            transport::open_icmp_channel().context("opening raw ICMP channel")?;
        let identifier: u16 = rand::random();
        let mut replies = icmp_packet_iter(&mut rx);
        let mut hops = Vec::new();

        debug!(
            %target,
            device = %self.device.name(),
            source = ?self.source(),
            identifier,
            "embedded trace started"
        );
        for ttl in 1..=max_hops {
            let sequence = u16::from(ttl);
            tx.set_ttl(ttl).context("setting probe TTL")?;
            let probe = echo_request(identifier, sequence).context("building echo request")?;
            let sent_at = Instant::now();
            tx.send_to(probe.to_immutable(), IpAddr::V4(target))
                .with_context(|| format!("sending probe with ttl {ttl}"))?;

            let mut hop = Hop {
                ttl,
                address: None,
                rtt: None,
            };
            let mut done = false;
            while let Some(remaining) = timeout
                .checked_sub(sent_at.elapsed())
                .filter(|r| !r.is_zero())
            {
                let Some((packet, source)) = replies.next_with_timeout(remaining)? else {
                    break;
                };
                let Some(reply) = classify(packet.packet(), identifier) else {
                    continue;
                };
                if reply.sequence() != sequence {
                    trace!(?reply, "late reply for an earlier probe");
                    continue;
                }
                hop.address = Some(source);
                hop.rtt = Some(sent_at.elapsed());
                done = !matches!(reply, ProbeReply::Transit(_));
                break;
            }

            trace!(ttl, address = ?hop.address, "hop");
            hops.push(hop);
            if done {
                break;
            }
        }
        Ok(hops)
    }

    /// Address the probes are reported as coming from.
    pub fn source(&self) -> Option<Ipv4Addr> {
        self.device.ips().iter().find_map(|net| match net.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
            _ => None,
        })
    }
}

fn echo_request(identifier: u16, sequence: u16) -> Option<MutableEchoRequestPacket<'static>> {
    let len = MutableEchoRequestPacket::minimum_packet_size() + ECHO_PAYLOAD.len();
    let mut probe = MutableEchoRequestPacket::owned(vec![0u8; len])?;
    probe.set_icmp_type(IcmpTypes::EchoRequest);
    probe.set_icmp_code(IcmpCode(0));
    probe.set_identifier(identifier);
    probe.set_sequence_number(sequence);
    probe.set_payload(ECHO_PAYLOAD);
    if let Some(packet) = IcmpPacket::new(probe.packet()) {
        let checksum = icmp::checksum(&packet);
        probe.set_checksum(checksum);
    }
    Some(probe)
}

/// Matches an incoming ICMP message against probes carrying `identifier`.
pub fn classify(message: &[u8], identifier: u16) -> Option<ProbeReply> {
    let packet = IcmpPacket::new(message)?;
    match packet.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let reply = EchoReplyPacket::new(message)?;
            (reply.get_identifier() == identifier)
                .then(|| ProbeReply::Arrived(reply.get_sequence_number()))
        }
        IcmpTypes::TimeExceeded => {
            quoted_sequence(message, identifier).map(ProbeReply::Transit)
        }
        IcmpTypes::DestinationUnreachable => {
            quoted_sequence(message, identifier).map(ProbeReply::Unreachable)
        }
        _ => None,
    }
}

/// ICMP errors quote the offending IP header and the first eight bytes of
/// our echo request.
fn quoted_sequence(message: &[u8], identifier: u16) -> Option<u16> {
    let quoted = message.get(ICMP_ERROR_HEADER_LEN..)?;
    let header = Ipv4Packet::new(quoted)?;
    if header.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }
    let header_len = usize::from(header.get_header_length()) * 4;
    let request = EchoRequestPacket::new(quoted.get(header_len..)?)?;
    (request.get_identifier() == identifier).then(|| request.get_sequence_number())
}
