//! # Route Tracer
//!
//! Exactly one backend is active at a time:
//!
//! * [`EmbeddedTracer`]: in-process, bound to an enumerated device.
//! * [`ExternalTracer`]: the operating system's traceroute, used whenever no
//!   device can serve [`Purpose::RouteTrace`].
//!
//! The tracer starts on the external backend; the orchestrator switches it to
//! the embedded one by binding a device.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{debug, info};
use vtrace_common::{NetworkDevice, Purpose};

use crate::error::{DeviceError, InitError};
use crate::provider::{CapabilityProvider, DeviceAware, ProviderContext, ProviderKind};
use crate::registry::DeviceSnapshot;

mod embedded;
mod external;

pub use embedded::{EmbeddedTracer, ProbeReply, classify};
pub use external::{ExternalTracer, Hop, parse_hop};

pub const DEFAULT_MAX_HOPS: u8 = 30;
/// How long the embedded tracer waits for an answer to each probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracerVariant {
    Embedded,
    External,
}

impl fmt::Display for TracerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracerVariant::Embedded => f.write_str("embedded"),
            TracerVariant::External => f.write_str("external"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracerBackend {
    Embedded(EmbeddedTracer),
    External(ExternalTracer),
}

pub struct RouteTracer {
    snapshot: Option<Arc<DeviceSnapshot>>,
    backend: TracerBackend,
}

impl Default for RouteTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTracer {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            backend: TracerBackend::External(ExternalTracer::new()),
        }
    }

    pub fn variant(&self) -> TracerVariant {
        match self.backend {
            TracerBackend::Embedded(_) => TracerVariant::Embedded,
            TracerBackend::External(_) => TracerVariant::External,
        }
    }

    pub fn backend(&self) -> &TracerBackend {
        &self.backend
    }

    pub fn bound_device(&self) -> Option<&NetworkDevice> {
        match &self.backend {
            TracerBackend::Embedded(embedded) => Some(embedded.device()),
            TracerBackend::External(_) => None,
        }
    }

    /// Switches to the OS traceroute, releasing any bound device.
    pub fn use_external(&mut self) {
        if let TracerBackend::Embedded(embedded) = &mut self.backend {
            embedded.dispose();
            let mut external = ExternalTracer::new();
            external.init();
            self.backend = TracerBackend::External(external);
        }
        info!(variant = %self.variant(), "route tracer selected");
    }

    /// Traces the route to `target` with whichever backend is active.
    pub async fn trace(&self, target: IpAddr, max_hops: u8) -> anyhow::Result<Vec<Hop>> {
        match &self.backend {
            TracerBackend::Embedded(embedded) => {
                let IpAddr::V4(target) = target else {
                    bail!("embedded tracing supports IPv4 targets only");
                };
                let embedded = embedded.clone();
                tokio::task::spawn_blocking(move || embedded.trace(target, max_hops, PROBE_TIMEOUT))
                    .await
                    .context("trace worker stopped unexpectedly")?
            }
            TracerBackend::External(external) => {
                external.trace(&target.to_string(), max_hops, None).await
            }
        }
    }
}

impl CapabilityProvider for RouteTracer {
    fn init(&mut self, _ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        if let TracerBackend::External(external) = &mut self.backend {
            external.init();
        }
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        match &mut self.backend {
            TracerBackend::Embedded(embedded) => embedded.dispose(),
            TracerBackend::External(external) => external.dispose(),
        }
        Ok(())
    }
}

impl DeviceAware for RouteTracer {
    fn notify_purposes(&mut self, purposes: &[Purpose], snapshot: &Arc<DeviceSnapshot>) {
        if purposes.contains(&Purpose::RouteTrace) {
            debug!(
                devices = snapshot.devices_for(Purpose::RouteTrace).len(),
                "route tracer received device list"
            );
            self.snapshot = Some(Arc::clone(snapshot));
        }
    }

    fn set_active_device(&mut self, purpose: Purpose, index: usize) -> Result<(), DeviceError> {
        if purpose != Purpose::RouteTrace {
            return Err(DeviceError::UnsupportedPurpose {
                provider: ProviderKind::RouteTracer,
                purpose,
            });
        }
        let snapshot = self.snapshot.as_ref().ok_or(DeviceError::NoSnapshot {
            provider: ProviderKind::RouteTracer,
        })?;
        let device = snapshot
            .device_for(purpose, index)
            .ok_or_else(|| DeviceError::InvalidDevice {
                purpose,
                index,
                available: snapshot.devices_for(purpose).len(),
            })?;

        if self.bound_device() == Some(device) {
            return Ok(());
        }
        if let TracerBackend::External(external) = &mut self.backend {
            external.dispose();
        }
        self.backend = TracerBackend::Embedded(EmbeddedTracer::bind(device.clone()));
        info!(variant = %self.variant(), device = %device.name(), "route tracer selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::datalink::NetworkInterface;
    use vtrace_common::PurposeSet;

    fn device(name: &str, index: u32) -> NetworkDevice {
        let interface = NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index,
            mac: None,
            ips: vec![],
            flags: 0,
        };
        NetworkDevice::discovered(&interface, PurposeSet::empty().with(Purpose::RouteTrace))
    }

    fn snapshot() -> Arc<DeviceSnapshot> {
        Arc::new(DeviceSnapshot::new(vec![device("eth0", 2), device("wlan0", 3)]))
    }

    #[test]
    fn starts_on_external_backend() {
        let tracer = RouteTracer::new();
        assert_eq!(tracer.variant(), TracerVariant::External);
        assert!(tracer.bound_device().is_none());
    }

    #[test]
    fn binding_before_announcement_fails() {
        let mut tracer = RouteTracer::new();
        assert_eq!(
            tracer.set_active_device(Purpose::RouteTrace, 0),
            Err(DeviceError::NoSnapshot {
                provider: ProviderKind::RouteTracer
            })
        );
    }

    #[test]
    fn binding_switches_to_embedded() {
        let mut tracer = RouteTracer::new();
        tracer.notify_purposes(&Purpose::ALL, &snapshot());

        tracer.set_active_device(Purpose::RouteTrace, 1).unwrap();
        assert_eq!(tracer.variant(), TracerVariant::Embedded);
        assert_eq!(tracer.bound_device().map(|d| d.name()), Some("wlan0"));

        tracer.set_active_device(Purpose::RouteTrace, 1).unwrap();
        assert_eq!(tracer.bound_device().map(|d| d.index()), Some(3));
    }

    #[test]
    fn stale_index_keeps_previous_backend() {
        let mut tracer = RouteTracer::new();
        tracer.notify_purposes(&Purpose::ALL, &snapshot());

        let err = tracer.set_active_device(Purpose::RouteTrace, 5).unwrap_err();
        assert_eq!(
            err,
            DeviceError::InvalidDevice {
                purpose: Purpose::RouteTrace,
                index: 5,
                available: 2
            }
        );
        assert_eq!(tracer.variant(), TracerVariant::External);
    }

    #[test]
    fn rejects_other_purposes() {
        let mut tracer = RouteTracer::new();
        tracer.notify_purposes(&Purpose::ALL, &snapshot());
        assert!(matches!(
            tracer.set_active_device(Purpose::PacketSniffer, 0),
            Err(DeviceError::UnsupportedPurpose { .. })
        ));
    }

    #[test]
    fn use_external_releases_device() {
        let mut tracer = RouteTracer::new();
        tracer.notify_purposes(&Purpose::ALL, &snapshot());
        tracer.set_active_device(Purpose::RouteTrace, 0).unwrap();

        tracer.use_external();
        assert_eq!(tracer.variant(), TracerVariant::External);
        assert!(tracer.bound_device().is_none());
    }

    #[tokio::test]
    async fn embedded_trace_rejects_ipv6_targets() {
        let mut tracer = RouteTracer::new();
        tracer.notify_purposes(&Purpose::ALL, &snapshot());
        tracer.set_active_device(Purpose::RouteTrace, 0).unwrap();

        let err = tracer.trace("2001:db8::1".parse().unwrap(), 3).await.unwrap_err();
        assert!(err.to_string().contains("IPv4"), "got {err}");
    }

    #[tokio::test]
    async fn external_trace_needs_a_program() {
        let tracer = RouteTracer::new();
        let err = tracer.trace("192.0.2.1".parse().unwrap(), 3).await.unwrap_err();
        assert!(err.to_string().contains("no traceroute program"), "got {err}");
    }
}
