use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};

use vtrace_core::HostProbe;

pub const IFF_UP: u32 = 1;
pub const IFF_BROADCAST: u32 = 1 << 1;
pub const IFF_LOOPBACK: u32 = 1 << 3;
pub const IFF_POINTOPOINT: u32 = 1 << 4;

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn v6(s: &str, p: u8) -> IpNetwork {
    IpNetwork::V6(Ipv6Network::new(s.parse::<Ipv6Addr>().unwrap(), p).unwrap())
}

pub fn mac(last: u8) -> Option<MacAddr> {
    Some(MacAddr::new(0x00, 0x1b, 0x21, 0x3a, 0x4f, last))
}

pub fn lo() -> NetworkInterface {
    ni("lo", 1, None, &[v4(127, 0, 0, 1, 8), v6("::1", 128)], IFF_UP | IFF_LOOPBACK)
}

pub fn eth0() -> NetworkInterface {
    ni(
        "eth0",
        2,
        mac(2),
        &[v4(192, 168, 0, 32, 24), v6("fe80::21b:21ff:fe3a:4f02", 64)],
        IFF_UP | IFF_BROADCAST,
    )
}

pub fn wlan0() -> NetworkInterface {
    ni("wlan0", 3, mac(3), &[v4(10, 0, 0, 12, 24)], IFF_UP | IFF_BROADCAST)
}

pub fn tun0() -> NetworkInterface {
    ni("tun0", 4, None, &[v4(10, 8, 0, 2, 24)], IFF_UP | IFF_POINTOPOINT)
}

/// Present but administratively down.
pub fn eth1() -> NetworkInterface {
    ni("eth1", 5, mac(5), &[v4(172, 16, 0, 2, 16)], IFF_BROADCAST)
}

/// Up with only a link-local IPv6 address.
pub fn veth0() -> NetworkInterface {
    ni("veth0", 6, mac(6), &[v6("fe80::1", 64)], IFF_UP | IFF_BROADCAST)
}

/// A host whose answers are fixed up front.
#[derive(Clone)]
pub struct MockProbe {
    interfaces: Option<Vec<NetworkInterface>>,
    raw_sockets: bool,
    capturable: Vec<String>,
}

impl MockProbe {
    pub fn new(interfaces: Vec<NetworkInterface>) -> Self {
        Self {
            interfaces: Some(interfaces),
            raw_sockets: true,
            capturable: Vec::new(),
        }
    }

    /// A host that refuses to list its interfaces.
    pub fn failing() -> Self {
        Self {
            interfaces: None,
            raw_sockets: true,
            capturable: Vec::new(),
        }
    }

    pub fn without_raw_sockets(mut self) -> Self {
        self.raw_sockets = false;
        self
    }

    pub fn capturable(mut self, names: &[&str]) -> Self {
        self.capturable = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

impl HostProbe for MockProbe {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>> {
        self.interfaces
            .clone()
            .ok_or_else(|| anyhow::anyhow!("operation not permitted"))
    }

    fn raw_socket_access(&self) -> bool {
        self.raw_sockets
    }

    fn can_capture(&self, interface: &NetworkInterface) -> bool {
        self.capturable.iter().any(|n| *n == interface.name)
    }
}
