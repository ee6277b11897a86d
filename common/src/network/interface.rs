//! Per-purpose interface viability.
//!
//! These checks only look at what the interface itself reports (flags and
//! addresses). Host-level requirements such as raw socket privileges or an
//! openable capture channel are probed separately by the registry.

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

use crate::purpose::Purpose;
use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback interfaces cannot reach remote hosts.
    IsLoopback,
    /// No IPv4 address outside 127.0.0.0/8 (ICMP probes are sent over IPv4).
    NoRoutableIpv4,
    /// Neither an address nor a MAC; nothing to capture on.
    NoLinkIdentity,
    /// No address of any kind.
    NoAddress,
}

/// Checks whether `interface` could serve `purpose`, ignoring host privileges.
pub fn check(purpose: Purpose, interface: &NetworkInterface) -> Result<(), ViabilityError> {
    match purpose {
        Purpose::RouteTrace => check_route_trace(interface),
        Purpose::PacketSniffer => check_sniffer(interface),
        Purpose::DirectoryLookup => check_directory_lookup(interface),
    }
}

fn check_route_trace(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.routable_ipv4().is_none() {
        return Err(ViabilityError::NoRoutableIpv4);
    }
    Ok(())
}

fn check_sniffer(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.ips.is_empty() && interface.mac.is_none() {
        return Err(ViabilityError::NoLinkIdentity);
    }
    Ok(())
}

fn check_directory_lookup(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    let has_address = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(v4) => !v4.ip().is_unspecified(),
        IpNetwork::V6(v6) => !v6.ip().is_unspecified(),
    });
    if !has_address {
        return Err(ViabilityError::NoAddress);
    }
    Ok(())
}
