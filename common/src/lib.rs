//! Shared vocabulary for the `vtrace` workspace.
//!
//! * **[`purpose`]**: the closed set of operational modes a device can serve.
//! * **[`device`]**: enumerated network devices and their capability flags.
//! * **[`network`]**: per-purpose interface viability rules.
//! * **[`config`]**: persisted user settings.

pub mod config;
pub mod device;
pub mod network;
pub mod purpose;
pub mod utils;

pub use device::NetworkDevice;
pub use purpose::{Purpose, PurposeSet};
