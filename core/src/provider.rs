//! # Capability Provider Contract
//!
//! Every leaf subsystem implements [`CapabilityProvider`]. The orchestrator is
//! the only caller of `init` and `dispose`, and it calls each at most once per
//! lifecycle. Providers that bind to a network device also implement
//! [`DeviceAware`].

use std::fmt;
use std::sync::Arc;

use vtrace_common::Purpose;
use vtrace_common::config::Settings;

use crate::error::{DeviceError, InitError};
use crate::progress::StartupProgress;
use crate::registry::DeviceSnapshot;

/// Stable names for the provider slots the orchestrator owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    NameResolver,
    LocationResolver,
    DeviceRegistry,
    RouteTracer,
    PacketSniffer,
    AddressAutocomplete,
    DirectoryResolver,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::NameResolver => "name resolver",
            ProviderKind::LocationResolver => "location resolver",
            ProviderKind::DeviceRegistry => "device registry",
            ProviderKind::RouteTracer => "route tracer",
            ProviderKind::PacketSniffer => "packet sniffer",
            ProviderKind::AddressAutocomplete => "address autocomplete",
            ProviderKind::DirectoryResolver => "directory resolver",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a provider can see while it initializes.
pub struct ProviderContext<'a> {
    settings: &'a Settings,
    progress: &'a dyn StartupProgress,
}

impl<'a> ProviderContext<'a> {
    pub fn new(settings: &'a Settings, progress: &'a dyn StartupProgress) -> Self {
        Self { settings, progress }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Reports a sub-step label without advancing the step counter.
    pub fn report(&self, label_key: &str) {
        self.progress.update_startup(label_key, false);
    }
}

pub trait CapabilityProvider: Send {
    /// Prepares the provider. Failure is fatal to the whole init sequence.
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError>;

    /// Releases whatever `init` acquired. Errors are collected by the caller,
    /// never propagated past the remaining teardown.
    fn dispose(&mut self) -> anyhow::Result<()>;
}

pub trait DeviceAware {
    /// Mode announcement: every purpose plus the snapshot to validate against.
    fn notify_purposes(&mut self, purposes: &[Purpose], snapshot: &Arc<DeviceSnapshot>);

    /// Binds `purpose` to the device at `index` in `devices_for(purpose)`.
    ///
    /// Re-binding to the device that is already active is a no-op.
    fn set_active_device(&mut self, purpose: Purpose, index: usize) -> Result<(), DeviceError>;
}
