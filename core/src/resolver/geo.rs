//! CIDR-table geolocation.
//!
//! The optional database is a CSV file, one network per line:
//!
//! ```text
//! # cidr,country,city,latitude,longitude
//! 1.1.1.0/24,AU,Sydney,-33.8688,151.2093
//! 2001:4860::/32,US,,37.4056,-122.0775
//! ```
//!
//! Lookups pick the most specific matching network.

use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use pnet::ipnetwork::IpNetwork;
use tracing::{debug, info};

use crate::error::InitError;
use crate::progress::STARTUP_RESOLVERS;
use crate::provider::{CapabilityProvider, ProviderContext};

use super::LocationResolver;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub country: String,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.city {
            Some(city) => write!(f, "{city}, {}", self.country)?,
            None => f.write_str(&self.country)?,
        }
        write!(f, " ({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone)]
struct GeoEntry {
    network: IpNetwork,
    location: Location,
}

#[derive(Default)]
pub struct GeoService {
    entries: Vec<GeoEntry>,
}

impl GeoService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load(path: &Path) -> Result<Vec<GeoEntry>, InitError> {
        let text = fs::read_to_string(path).map_err(|e| {
            InitError::Unavailable(format!("geo database {}: {e}", path.display()))
        })?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(idx, line)| {
                parse_entry(line).ok_or_else(|| {
                    InitError::InvalidConfig(format!(
                        "geo database {} line {}: {line:?}",
                        path.display(),
                        idx + 1
                    ))
                })
            })
            .collect()
    }
}

fn parse_entry(line: &str) -> Option<GeoEntry> {
    let mut fields = line.split(',').map(str::trim);
    let network: IpNetwork = fields.next()?.parse().ok()?;
    let country = fields.next().filter(|c| !c.is_empty())?.to_string();
    let city = fields.next().filter(|c| !c.is_empty()).map(str::to_string);
    let latitude: f64 = fields.next()?.parse().ok()?;
    let longitude: f64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(GeoEntry {
        network,
        location: Location {
            country,
            city,
            latitude,
            longitude,
        },
    })
}

fn is_locatable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unicast_link_local()
                || v6.is_unique_local())
        }
    }
}

impl CapabilityProvider for GeoService {
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        ctx.report(STARTUP_RESOLVERS);
        self.entries = match ctx.settings().geo_database() {
            Some(path) => Self::load(path)?,
            None => Vec::new(),
        };
        info!(networks = self.entries.len(), "geo database loaded");
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        debug!("geo database released");
        self.entries.clear();
        Ok(())
    }
}

impl LocationResolver for GeoService {
    fn locate(&self, ip: IpAddr) -> Option<Location> {
        if !is_locatable(ip) {
            return None;
        }
        self.entries
            .iter()
            .filter(|entry| entry.network.contains(ip))
            .max_by_key(|entry| entry.network.prefix())
            .map(|entry| entry.location.clone())
    }
}
