//! # Orchestrator
//!
//! Owns every capability provider and the device registry, and is the single
//! authority over their lifecycle:
//!
//! 1. name and location resolvers
//! 2. device registry (enumeration)
//! 3. route tracer, packet sniffer, autocomplete, directory resolver
//! 4. mode announcement to the device-aware providers
//! 5. route-trace device selection, falling back to the OS traceroute
//! 6. sniffer device selection, staying inert when nothing fits
//!
//! Steps 1-4 are fatal on failure. Steps 5 and 6 never fail: a missing or
//! stale device is handled by policy and is observable through
//! [`Orchestrator::is_embedded_trace_available`] and
//! [`Orchestrator::is_sniffer_available`].
//!
//! Teardown walks the providers that actually initialized in reverse order and
//! keeps going past individual failures.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use vtrace_common::Purpose;
use vtrace_common::config::Settings;

use crate::autocomplete::{AddressAutocomplete, HistoryAutocomplete};
use crate::error::{DeviceError, DisposeError, InitError, OrchestratorError};
use crate::progress::{
    NoProgress, STARTUP_DEVICES, STARTUP_NETWORK, STARTUP_PROVIDERS, STARTUP_READY,
    STARTUP_RESOLVERS, StartupProgress,
};
use crate::provider::{CapabilityProvider, DeviceAware, ProviderContext, ProviderKind};
use crate::registry::{DeviceRegistry, DeviceSnapshot, HostProbe, PnetProbe};
use crate::resolver::{
    DirectoryResolver, DnsLookupService, GeoService, LocationResolver, NameResolver, WhoIs,
};
use crate::sniffer::PacketSniffer;
use crate::tracer::RouteTracer;

const RESOLVER_STEP: [ProviderKind; 2] = [ProviderKind::NameResolver, ProviderKind::LocationResolver];
const NETWORK_STEP: [ProviderKind; 1] = [ProviderKind::DeviceRegistry];
const PROVIDER_STEP: [ProviderKind; 4] = [
    ProviderKind::RouteTracer,
    ProviderKind::PacketSniffer,
    ProviderKind::AddressAutocomplete,
    ProviderKind::DirectoryResolver,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// Init started; stays here if a fatal step failed.
    Initializing,
    Ready,
    Disposed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

struct Providers {
    registry: DeviceRegistry,
    tracer: RouteTracer,
    sniffer: PacketSniffer,
    name_resolver: Box<dyn NameResolver>,
    location_resolver: Box<dyn LocationResolver>,
    directory_resolver: Box<dyn DirectoryResolver>,
    autocomplete: Box<dyn AddressAutocomplete>,
}

impl Providers {
    fn init(&mut self, kind: ProviderKind, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        match kind {
            ProviderKind::NameResolver => self.name_resolver.init(ctx),
            ProviderKind::LocationResolver => self.location_resolver.init(ctx),
            ProviderKind::DeviceRegistry => self.registry.init(ctx),
            ProviderKind::RouteTracer => self.tracer.init(ctx),
            ProviderKind::PacketSniffer => self.sniffer.init(ctx),
            ProviderKind::AddressAutocomplete => self.autocomplete.init(ctx),
            ProviderKind::DirectoryResolver => self.directory_resolver.init(ctx),
        }
    }

    fn dispose(&mut self, kind: ProviderKind) -> anyhow::Result<()> {
        match kind {
            ProviderKind::NameResolver => self.name_resolver.dispose(),
            ProviderKind::LocationResolver => self.location_resolver.dispose(),
            ProviderKind::DeviceRegistry => self.registry.dispose(),
            ProviderKind::RouteTracer => self.tracer.dispose(),
            ProviderKind::PacketSniffer => self.sniffer.dispose(),
            ProviderKind::AddressAutocomplete => self.autocomplete.dispose(),
            ProviderKind::DirectoryResolver => self.directory_resolver.dispose(),
        }
    }
}

pub struct Orchestrator {
    state: LifecycleState,
    providers: Providers,
    progress: Arc<dyn StartupProgress>,
    /// Providers whose `init` succeeded, in init order.
    initialized: Vec<ProviderKind>,
    /// Providers `dispose` was called on, in call order.
    disposed: Vec<ProviderKind>,
    selection: BTreeMap<Purpose, usize>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Runs the full init sequence. `settings` is read for the stored device
    /// indices and updated when the OS traceroute fallback is forced.
    pub fn init(&mut self, settings: &mut Settings) -> Result<(), OrchestratorError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(OrchestratorError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }
        self.state = LifecycleState::Initializing;
        info!("initializing providers");

        let progress = Arc::clone(&self.progress);
        {
            let ctx = ProviderContext::new(settings, progress.as_ref());

            progress.update_startup(STARTUP_RESOLVERS, true);
            self.init_step(&RESOLVER_STEP, &ctx)?;

            progress.update_startup(STARTUP_NETWORK, true);
            self.init_step(&NETWORK_STEP, &ctx)?;

            progress.update_startup(STARTUP_PROVIDERS, true);
            self.init_step(&PROVIDER_STEP, &ctx)?;
        }

        progress.update_startup(STARTUP_DEVICES, true);
        let snapshot = self.providers.registry.snapshot();
        self.providers.tracer.notify_purposes(&Purpose::ALL, &snapshot);
        self.providers.sniffer.notify_purposes(&Purpose::ALL, &snapshot);

        self.select_route_tracer(&snapshot, settings);
        self.select_sniffer(&snapshot, settings);

        self.state = LifecycleState::Ready;
        progress.update_startup(STARTUP_READY, true);
        info!(
            tracer = %self.providers.tracer.variant(),
            sniffer_active = self.providers.sniffer.is_active(),
            "orchestrator ready"
        );
        Ok(())
    }

    fn init_step(
        &mut self,
        kinds: &[ProviderKind],
        ctx: &ProviderContext<'_>,
    ) -> Result<(), OrchestratorError> {
        for &kind in kinds {
            debug!(provider = %kind, "initializing");
            if let Err(source) = self.providers.init(kind, ctx) {
                error!(provider = %kind, error = %source, "initialization failed");
                return Err(OrchestratorError::Init {
                    provider: kind,
                    source,
                });
            }
            self.initialized.push(kind);
        }
        Ok(())
    }

    fn select_route_tracer(&mut self, snapshot: &DeviceSnapshot, settings: &mut Settings) {
        let purpose = Purpose::RouteTrace;
        if snapshot.is_available(purpose) {
            let index = settings.traceroute_interface_index();
            match self.providers.tracer.set_active_device(purpose, index) {
                Ok(()) => {
                    self.selection.insert(purpose, index);
                    return;
                }
                Err(e) => warn!(%purpose, index, error = %e, "stored device is stale"),
            }
        } else {
            info!(%purpose, "no capable device");
        }
        info!("falling back to the OS traceroute");
        settings.set_use_os_traceroute(true);
        self.providers.tracer.use_external();
    }

    fn select_sniffer(&mut self, snapshot: &DeviceSnapshot, settings: &Settings) {
        let purpose = Purpose::PacketSniffer;
        if !snapshot.is_available(purpose) {
            info!(%purpose, "no capable device, sniffer stays inert");
            return;
        }
        let index = settings.sniffer_interface_index();
        match self.providers.sniffer.set_active_device(purpose, index) {
            Ok(()) => {
                self.selection.insert(purpose, index);
            }
            Err(e) => warn!(%purpose, index, error = %e, "stored device is stale, sniffer stays inert"),
        }
    }

    /// Rebinds `purpose` to the device at `index` in its device list and
    /// stores the choice in `settings`.
    ///
    /// On error the previous binding and `settings` are left untouched.
    pub fn select_device(
        &mut self,
        purpose: Purpose,
        index: usize,
        settings: &mut Settings,
    ) -> Result<(), OrchestratorError> {
        if self.state != LifecycleState::Ready {
            return Err(OrchestratorError::InvalidState {
                operation: "select a device",
                state: self.state,
            });
        }
        match purpose {
            Purpose::RouteTrace => {
                self.providers.tracer.set_active_device(purpose, index)?;
                settings.set_traceroute_interface_index(index);
                settings.set_use_os_traceroute(false);
            }
            Purpose::PacketSniffer => {
                self.providers.sniffer.set_active_device(purpose, index)?;
                settings.set_sniffer_interface_index(index);
            }
            Purpose::DirectoryLookup => {
                return Err(DeviceError::UnsupportedPurpose {
                    provider: ProviderKind::DirectoryResolver,
                    purpose,
                }
                .into());
            }
        }
        self.selection.insert(purpose, index);
        info!(%purpose, index, "device selected");
        Ok(())
    }

    /// Releases every initialized provider in reverse init order.
    ///
    /// Individual failures are logged and returned; the remaining providers
    /// are still released. Calling this again is a no-op.
    pub fn dispose(&mut self) -> Vec<DisposeError> {
        if self.state == LifecycleState::Disposed {
            debug!("already disposed");
            return Vec::new();
        }
        info!("disposing providers");

        let mut failures = Vec::new();
        for &kind in self.initialized.iter().rev() {
            debug!(provider = %kind, "disposing");
            self.disposed.push(kind);
            if let Err(source) = self.providers.dispose(kind) {
                warn!(provider = %kind, error = %source, "dispose failed, continuing");
                failures.push(DisposeError {
                    provider: kind,
                    source,
                });
            }
        }

        self.state = LifecycleState::Disposed;
        failures
    }

    pub fn is_embedded_trace_available(&self) -> bool {
        self.providers.registry.is_available(Purpose::RouteTrace)
    }

    pub fn is_sniffer_available(&self) -> bool {
        self.providers.registry.is_available(Purpose::PacketSniffer)
    }

    /// Providers whose `init` succeeded, in init order. Kept after dispose.
    pub fn initialized_providers(&self) -> &[ProviderKind] {
        &self.initialized
    }

    /// Providers released by [`Orchestrator::dispose`], in release order,
    /// including those whose dispose failed.
    pub fn disposed_providers(&self) -> &[ProviderKind] {
        &self.disposed
    }

    /// Last position successfully bound for `purpose`, if any.
    pub fn selected_device(&self, purpose: Purpose) -> Option<usize> {
        self.selection.get(&purpose).copied()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.providers.registry
    }

    pub fn route_tracer(&self) -> &RouteTracer {
        &self.providers.tracer
    }

    pub fn packet_sniffer(&self) -> &PacketSniffer {
        &self.providers.sniffer
    }

    pub fn packet_sniffer_mut(&mut self) -> &mut PacketSniffer {
        &mut self.providers.sniffer
    }

    pub fn name_resolver(&self) -> &dyn NameResolver {
        self.providers.name_resolver.as_ref()
    }

    pub fn location_resolver(&self) -> &dyn LocationResolver {
        self.providers.location_resolver.as_ref()
    }

    pub fn directory_resolver(&self) -> &dyn DirectoryResolver {
        self.providers.directory_resolver.as_ref()
    }

    pub fn autocomplete(&self) -> &dyn AddressAutocomplete {
        self.providers.autocomplete.as_ref()
    }
}

/// Assembles an [`Orchestrator`]. Anything not supplied gets the real
/// implementation.
#[derive(Default)]
pub struct OrchestratorBuilder {
    probe: Option<Box<dyn HostProbe>>,
    progress: Option<Arc<dyn StartupProgress>>,
    name_resolver: Option<Box<dyn NameResolver>>,
    location_resolver: Option<Box<dyn LocationResolver>>,
    directory_resolver: Option<Box<dyn DirectoryResolver>>,
    autocomplete: Option<Box<dyn AddressAutocomplete>>,
}

impl OrchestratorBuilder {
    pub fn probe(mut self, probe: Box<dyn HostProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn StartupProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn name_resolver(mut self, resolver: Box<dyn NameResolver>) -> Self {
        self.name_resolver = Some(resolver);
        self
    }

    pub fn location_resolver(mut self, resolver: Box<dyn LocationResolver>) -> Self {
        self.location_resolver = Some(resolver);
        self
    }

    pub fn directory_resolver(mut self, resolver: Box<dyn DirectoryResolver>) -> Self {
        self.directory_resolver = Some(resolver);
        self
    }

    pub fn autocomplete(mut self, autocomplete: Box<dyn AddressAutocomplete>) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }

    pub fn build(self) -> Orchestrator {
        let providers = Providers {
            registry: DeviceRegistry::new(self.probe.unwrap_or_else(|| Box::new(PnetProbe))),
            tracer: RouteTracer::new(),
            sniffer: PacketSniffer::new(),
            name_resolver: self
                .name_resolver
                .unwrap_or_else(|| Box::new(DnsLookupService::new())),
            location_resolver: self
                .location_resolver
                .unwrap_or_else(|| Box::new(GeoService::new())),
            directory_resolver: self
                .directory_resolver
                .unwrap_or_else(|| Box::new(WhoIs::new())),
            autocomplete: self
                .autocomplete
                .unwrap_or_else(|| Box::new(HistoryAutocomplete::new())),
        };
        Orchestrator {
            state: LifecycleState::Uninitialized,
            providers,
            progress: self.progress.unwrap_or_else(|| Arc::new(NoProgress)),
            initialized: Vec::new(),
            disposed: Vec::new(),
            selection: BTreeMap::new(),
        }
    }
}
