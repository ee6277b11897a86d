use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use tracing::debug;

use vtrace_common::config::DEFAULT_LOOKUP_TIMEOUT_MS;

use crate::error::InitError;
use crate::progress::STARTUP_RESOLVERS;
use crate::provider::{CapabilityProvider, ProviderContext};

use super::NameResolver;

/// Upper bound on cached host names; the oldest entry is evicted first.
pub const CACHE_CAPACITY: usize = 256;

#[derive(Default)]
struct Cache {
    entries: HashMap<String, Vec<IpAddr>>,
    order: VecDeque<String>,
}

impl Cache {
    fn insert(&mut self, host: String, ips: Vec<IpAddr>) {
        if self.entries.insert(host.clone(), ips).is_some() {
            return;
        }
        self.order.push_back(host);
        while self.order.len() > CACHE_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Forward DNS through the system resolver, with a bounded per-session cache.
pub struct DnsLookupService {
    timeout: Duration,
    cache: Mutex<Cache>,
}

impl Default for DnsLookupService {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsLookupService {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
            cache: Mutex::new(Cache::default()),
        }
    }

    pub fn cached(&self, host: &str) -> Option<Vec<IpAddr>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.entries.get(&host.to_ascii_lowercase()).cloned()
    }

    fn remember(&self, host: &str, ips: Vec<IpAddr>) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_ascii_lowercase(), ips);
    }
}

impl CapabilityProvider for DnsLookupService {
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        ctx.report(STARTUP_RESOLVERS);
        let timeout_ms = ctx.settings().lookup_timeout_ms();
        if timeout_ms == 0 {
            return Err(InitError::InvalidConfig(
                "lookup_timeout_ms must be positive".to_string(),
            ));
        }
        self.timeout = Duration::from_millis(timeout_ms);
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(entries = cache.entries.len(), "dns cache cleared");
        cache.clear();
        Ok(())
    }
}

#[async_trait]
impl NameResolver for DnsLookupService {
    async fn resolve(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        if let Some(ips) = self.cached(host) {
            return Ok(ips);
        }

        let lookup = tokio::net::lookup_host((host, 0));
        let addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .with_context(|| format!("dns lookup for {host} timed out"))?
            .with_context(|| format!("dns lookup for {host} failed"))?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        ensure!(!ips.is_empty(), "{host} has no addresses");

        debug!(%host, count = ips.len(), "resolved");
        self.remember(host, ips.clone());
        Ok(ips)
    }
}
