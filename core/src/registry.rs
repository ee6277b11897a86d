//! # Network Device Registry
//!
//! Enumerates host interfaces once per init cycle and tags each with the
//! purposes it can serve on this host. The result is a [`DeviceSnapshot`],
//! shared read-only with the device-aware providers.
//!
//! Enumeration never fails from the caller's point of view: if the host cannot
//! be queried the snapshot is simply empty, which leads to the same fallback
//! decisions as a host with no capable devices.

use std::sync::Arc;

use pnet::datalink::{self, NetworkInterface};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use vtrace_common::network::interface;
use vtrace_common::{NetworkDevice, Purpose, PurposeSet};

use crate::error::InitError;
use crate::network::{channel, transport};
use crate::progress::STARTUP_DEVICES;
use crate::provider::{CapabilityProvider, ProviderContext};

/// Host-level questions the registry asks during enumeration.
pub trait HostProbe: Send + Sync {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>>;

    /// Whether raw ICMP sockets can be opened at all.
    fn raw_socket_access(&self) -> bool;

    /// Whether a capture channel can be opened on `interface`.
    fn can_capture(&self, interface: &NetworkInterface) -> bool;
}

/// Probes the real host through pnet.
pub struct PnetProbe;

impl HostProbe for PnetProbe {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>> {
        Ok(datalink::interfaces())
    }

    fn raw_socket_access(&self) -> bool {
        transport::raw_socket_access()
    }

    fn can_capture(&self, interface: &NetworkInterface) -> bool {
        channel::can_capture(interface)
    }
}

/// Immutable result of one enumeration, in discovery order.
#[derive(Debug, Default, Clone)]
pub struct DeviceSnapshot {
    devices: Vec<NetworkDevice>,
}

impl DeviceSnapshot {
    pub fn new(devices: Vec<NetworkDevice>) -> Self {
        Self { devices }
    }

    /// Runs the full capability detection against `probe`.
    pub fn enumerate(probe: &dyn HostProbe) -> Self {
        let interfaces = match probe.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!(error = %e, "interface enumeration failed, treating host as device-less");
                return Self::default();
            }
        };

        let raw_sockets = probe.raw_socket_access();
        if !raw_sockets {
            info!("raw sockets unavailable, embedded route tracing disabled");
        }

        let devices: Vec<NetworkDevice> = interfaces
            .par_iter()
            .map(|intf| NetworkDevice::discovered(intf, detect(intf, raw_sockets, probe)))
            .collect();

        Self { devices }
    }

    pub fn devices(&self) -> &[NetworkDevice] {
        &self.devices
    }

    pub fn devices_for(&self, purpose: Purpose) -> Vec<&NetworkDevice> {
        self.devices.iter().filter(|d| d.serves(purpose)).collect()
    }

    /// The device at `index` in `devices_for(purpose)`.
    pub fn device_for(&self, purpose: Purpose, index: usize) -> Option<&NetworkDevice> {
        self.devices.iter().filter(|d| d.serves(purpose)).nth(index)
    }

    pub fn is_available(&self, purpose: Purpose) -> bool {
        self.devices.iter().any(|d| d.serves(purpose))
    }
}

fn detect(intf: &NetworkInterface, raw_sockets: bool, probe: &dyn HostProbe) -> PurposeSet {
    let mut capabilities = PurposeSet::empty();
    for purpose in Purpose::ALL {
        if let Err(reason) = interface::check(purpose, intf) {
            debug!(interface = %intf.name, %purpose, ?reason, "not viable");
            continue;
        }
        let usable = match purpose {
            Purpose::RouteTrace => raw_sockets,
            Purpose::PacketSniffer => probe.can_capture(intf),
            Purpose::DirectoryLookup => true,
        };
        if usable {
            capabilities.insert(purpose);
        }
    }
    capabilities
}

/// The registry as an orchestrated provider: `init` enumerates.
pub struct DeviceRegistry {
    probe: Box<dyn HostProbe>,
    snapshot: Arc<DeviceSnapshot>,
}

impl DeviceRegistry {
    pub fn new(probe: Box<dyn HostProbe>) -> Self {
        Self {
            probe,
            snapshot: Arc::new(DeviceSnapshot::default()),
        }
    }

    /// Replaces the snapshot with a fresh enumeration.
    pub fn refresh(&mut self) -> Arc<DeviceSnapshot> {
        self.snapshot = Arc::new(DeviceSnapshot::enumerate(self.probe.as_ref()));
        Arc::clone(&self.snapshot)
    }

    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn devices(&self) -> &[NetworkDevice] {
        self.snapshot.devices()
    }

    pub fn devices_for(&self, purpose: Purpose) -> Vec<&NetworkDevice> {
        self.snapshot.devices_for(purpose)
    }

    pub fn is_available(&self, purpose: Purpose) -> bool {
        self.snapshot.is_available(purpose)
    }
}

impl CapabilityProvider for DeviceRegistry {
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        ctx.report(STARTUP_DEVICES);
        let snapshot = self.refresh();
        for purpose in Purpose::ALL {
            info!(
                %purpose,
                devices = snapshot.devices_for(purpose).len(),
                "device enumeration"
            );
        }
        Ok(())
    }

    /// The snapshot is kept so accessors stay meaningful after teardown.
    fn dispose(&mut self) -> anyhow::Result<()> {
        debug!(devices = self.snapshot.devices().len(), "device registry released");
        Ok(())
    }
}
