use std::io;

use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use tracing::debug;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// Opens the raw ICMPv4 channel embedded route tracing sends probes over.
pub fn open_icmp_channel() -> io::Result<(TransportSender, TransportReceiver)> {
    transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
}

/// Whether this process may open raw ICMP sockets (root or `CAP_NET_RAW`).
///
/// The channel is opened and dropped straight away.
pub fn raw_socket_access() -> bool {
    if !is_root::is_root() {
        debug!("not running as root, probing for raw socket capability");
    }
    match open_icmp_channel() {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "raw ICMP socket unavailable");
            false
        }
    }
}
