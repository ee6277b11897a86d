//! # vtrace core
//!
//! Lifecycle and device-selection authority for the traceroute toolkit.
//!
//! * **[`registry`]**: enumerates host devices and tags them per purpose.
//! * **[`provider`]**: the init/dispose contract every capability provider implements.
//! * **[`tracer`]**, **[`sniffer`]**: the two device-aware providers.
//! * **[`resolver`]**, **[`autocomplete`]**: device-independent providers.
//! * **[`orchestrator`]**: ordered init, fallback selection and best-effort teardown.

pub mod autocomplete;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod sniffer;
pub mod tracer;

pub use error::{DeviceError, DisposeError, InitError, OrchestratorError};
pub use orchestrator::{LifecycleState, Orchestrator, OrchestratorBuilder};
pub use provider::{CapabilityProvider, DeviceAware, ProviderContext, ProviderKind};
pub use registry::{DeviceRegistry, DeviceSnapshot, HostProbe, PnetProbe};
