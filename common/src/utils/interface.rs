use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};

/// Address helpers used by the viability rules and device descriptions.
pub trait NetworkInterfaceExtension {
    fn ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn ipv6_nets(&self) -> Vec<Ipv6Network>;
    /// First IPv4 network whose address is not in 127.0.0.0/8.
    fn routable_ipv4(&self) -> Option<Ipv4Network>;
    /// One-line description: the OS description when present, else name and first address.
    fn summary(&self) -> String;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| match ip {
                IpNetwork::V4(ipv4) => Some(*ipv4),
                IpNetwork::V6(_) => None,
            })
            .collect()
    }

    fn ipv6_nets(&self) -> Vec<Ipv6Network> {
        self.ips
            .iter()
            .filter_map(|ip| match ip {
                IpNetwork::V6(ipv6) => Some(*ipv6),
                IpNetwork::V4(_) => None,
            })
            .collect()
    }

    fn routable_ipv4(&self) -> Option<Ipv4Network> {
        self.ipv4_nets()
            .into_iter()
            .find(|net| !net.ip().is_loopback())
    }

    fn summary(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.trim().to_string();
        }
        let address = self
            .routable_ipv4()
            .map(|net| net.to_string())
            .or_else(|| self.ipv6_nets().first().map(|net| net.to_string()));
        match address {
            Some(address) => format!("{} ({address})", self.name),
            None => self.name.clone(),
        }
    }
}
