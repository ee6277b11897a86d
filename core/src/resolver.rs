//! # Resolvers
//!
//! Device-independent lookup services. Each is a [`CapabilityProvider`] with
//! no device binding; the orchestrator owns them as trait objects so other
//! implementations can be swapped in through the builder.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::provider::CapabilityProvider;

pub mod dns;
pub mod geo;
pub mod whois;

pub use dns::DnsLookupService;
pub use geo::{GeoService, Location};
pub use whois::WhoIs;

#[async_trait]
pub trait NameResolver: CapabilityProvider + Sync {
    /// Forward lookup. Literal addresses resolve to themselves.
    async fn resolve(&self, host: &str) -> anyhow::Result<Vec<IpAddr>>;
}

pub trait LocationResolver: CapabilityProvider + Sync {
    /// `None` for addresses with no known location (including private ranges).
    fn locate(&self, ip: IpAddr) -> Option<Location>;
}

#[async_trait]
pub trait DirectoryResolver: CapabilityProvider + Sync {
    /// Raw WHOIS text for a domain, address or AS number.
    async fn query(&self, name: &str) -> anyhow::Result<String>;
}
