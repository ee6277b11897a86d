//! Startup progress reporting.
//!
//! The presentation layer, when there is one, implements [`StartupProgress`].
//! Headless callers get [`NoProgress`].

pub const STARTUP_RESOLVERS: &str = "startup.resolvers";
pub const STARTUP_NETWORK: &str = "startup.network";
pub const STARTUP_PROVIDERS: &str = "startup.providers";
pub const STARTUP_DEVICES: &str = "startup.devices";
pub const STARTUP_READY: &str = "startup.ready";

/// Number of steps that call `update_startup` with `increment_step = true`.
pub const STARTUP_STEPS: u64 = 5;

pub trait StartupProgress: Send + Sync {
    fn update_startup(&self, label_key: &str, increment_step: bool);
}

pub struct NoProgress;

impl StartupProgress for NoProgress {
    fn update_startup(&self, _label_key: &str, _increment_step: bool) {}
}
