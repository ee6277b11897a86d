use thiserror::Error;
use vtrace_common::Purpose;

use crate::orchestrator::LifecycleState;
use crate::provider::ProviderKind;

/// Unrecoverable provider setup failure.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("resource unavailable: {0}")]
    Unavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The stored index does not exist in the current snapshot.
    #[error("no {purpose} device at position {index} ({available} available)")]
    InvalidDevice {
        purpose: Purpose,
        index: usize,
        available: usize,
    },
    #[error("{provider} cannot bind a device for {purpose}")]
    UnsupportedPurpose {
        provider: ProviderKind,
        purpose: Purpose,
    },
    /// Binding was attempted before the mode announcement delivered a snapshot.
    #[error("{provider} has not received a device snapshot")]
    NoSnapshot { provider: ProviderKind },
}

#[derive(Debug, Error)]
#[error("failed to release {provider}")]
pub struct DisposeError {
    pub provider: ProviderKind,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to initialize {provider}")]
    Init {
        provider: ProviderKind,
        #[source]
        source: InitError,
    },
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
    #[error(transparent)]
    Device(#[from] DeviceError),
}
