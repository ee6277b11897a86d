//! # Network Devices
//!
//! A [`NetworkDevice`] is one host interface as seen at enumeration time,
//! tagged with the purposes it can serve. Devices are produced by the device
//! registry and never mutated afterwards.

use std::fmt;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use pnet::util::MacAddr;

use crate::purpose::{Purpose, PurposeSet};
use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDevice {
    index: u32,
    name: String,
    description: String,
    mac: Option<MacAddr>,
    ips: Vec<IpNetwork>,
    capabilities: PurposeSet,
}

impl NetworkDevice {
    /// Captures `interface` together with the capabilities detected for it.
    ///
    /// Only the enumeration path should call this; everything else receives
    /// devices from a registry snapshot.
    pub fn discovered(interface: &NetworkInterface, capabilities: PurposeSet) -> Self {
        Self {
            index: interface.index,
            name: interface.name.clone(),
            description: interface.summary(),
            mac: interface.mac,
            ips: interface.ips.clone(),
            capabilities,
        }
    }

    /// OS interface index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mac(&self) -> Option<MacAddr> {
        self.mac
    }

    pub fn ips(&self) -> &[IpNetwork] {
        &self.ips
    }

    pub fn capabilities(&self) -> PurposeSet {
        self.capabilities
    }

    pub fn serves(&self, purpose: Purpose) -> bool {
        self.capabilities.contains(purpose)
    }
}

impl fmt::Display for NetworkDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.description)
    }
}
