//! # Packet Sniffer
//!
//! Inert until a capture-capable device is bound. Once active, captures run
//! on their own thread and are stopped on rebinding or dispose.

use std::sync::Arc;

use anyhow::bail;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};
use vtrace_common::{NetworkDevice, Purpose};

use crate::error::{DeviceError, InitError};
use crate::provider::{CapabilityProvider, DeviceAware, ProviderContext, ProviderKind};
use crate::registry::DeviceSnapshot;

mod capture;

pub use capture::{CaptureHandle, CapturedFrame};

pub struct ActiveSniffer {
    device: NetworkDevice,
    capture: Option<CaptureHandle>,
}

impl ActiveSniffer {
    pub fn device(&self) -> &NetworkDevice {
        &self.device
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn stop_capture(&mut self) -> anyhow::Result<()> {
        match self.capture.take() {
            Some(mut handle) => handle.stop(),
            None => Ok(()),
        }
    }
}

pub enum SnifferBackend {
    /// No device bound; every capture request is refused.
    Inert,
    Active(ActiveSniffer),
}

pub struct PacketSniffer {
    snapshot: Option<Arc<DeviceSnapshot>>,
    backend: SnifferBackend,
}

impl Default for PacketSniffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketSniffer {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            backend: SnifferBackend::Inert,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.backend, SnifferBackend::Active(_))
    }

    pub fn backend(&self) -> &SnifferBackend {
        &self.backend
    }

    pub fn bound_device(&self) -> Option<&NetworkDevice> {
        match &self.backend {
            SnifferBackend::Active(active) => Some(active.device()),
            SnifferBackend::Inert => None,
        }
    }

    /// Starts capturing on the bound device.
    pub fn start_capture(&mut self) -> anyhow::Result<UnboundedReceiver<CapturedFrame>> {
        let SnifferBackend::Active(active) = &mut self.backend else {
            bail!("packet sniffer is inert: no capture device bound");
        };
        if active.is_capturing() {
            bail!("capture already running on {}", active.device.name());
        }
        let (handle, frames) = CaptureHandle::start(active.device.name())?;
        active.capture = Some(handle);
        Ok(frames)
    }

    pub fn stop_capture(&mut self) -> anyhow::Result<()> {
        match &mut self.backend {
            SnifferBackend::Active(active) => active.stop_capture(),
            SnifferBackend::Inert => Ok(()),
        }
    }
}

impl CapabilityProvider for PacketSniffer {
    fn init(&mut self, _ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        debug!("packet sniffer initialized, awaiting device");
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        self.stop_capture()
    }
}

impl DeviceAware for PacketSniffer {
    fn notify_purposes(&mut self, purposes: &[Purpose], snapshot: &Arc<DeviceSnapshot>) {
        if purposes.contains(&Purpose::PacketSniffer) {
            debug!(
                devices = snapshot.devices_for(Purpose::PacketSniffer).len(),
                "packet sniffer received device list"
            );
            self.snapshot = Some(Arc::clone(snapshot));
        }
    }

    fn set_active_device(&mut self, purpose: Purpose, index: usize) -> Result<(), DeviceError> {
        if purpose != Purpose::PacketSniffer {
            return Err(DeviceError::UnsupportedPurpose {
                provider: ProviderKind::PacketSniffer,
                purpose,
            });
        }
        let snapshot = self.snapshot.as_ref().ok_or(DeviceError::NoSnapshot {
            provider: ProviderKind::PacketSniffer,
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
        if let SnifferBackend::Active(previous) = &mut self.backend {
            if let Err(e) = previous.stop_capture() {
                debug!(error = %e, "previous capture did not stop cleanly");
            }
        }
        self.backend = SnifferBackend::Active(ActiveSniffer {
            device: device.clone(),
            capture: None,
        });
        info!(device = %device.name(), "packet sniffer bound");
        Ok(())
    }
}
