use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vtrace_core::autocomplete::AddressAutocomplete;
use vtrace_core::resolver::{DirectoryResolver, Location, LocationResolver, NameResolver};
use vtrace_core::{CapabilityProvider, InitError, ProviderContext, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Init(ProviderKind),
    Dispose(ProviderKind),
}

/// Shared, ordered record of lifecycle calls across several fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn disposed(&self) -> Vec<ProviderKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Dispose(kind) => Some(kind),
                Call::Init(_) => None,
            })
            .collect()
    }

    pub fn initialized(&self) -> Vec<ProviderKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Init(kind) => Some(kind),
                Call::Dispose(_) => None,
            })
            .collect()
    }
}

/// Stand-in for any of the device-independent providers.
pub struct FakeProvider {
    kind: ProviderKind,
    log: CallLog,
    fail_init: bool,
    fail_dispose: bool,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind, log: &CallLog) -> Self {
        Self {
            kind,
            log: log.clone(),
            fail_init: false,
            fail_dispose: false,
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_dispose(mut self) -> Self {
        self.fail_dispose = true;
        self
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }
}

impl CapabilityProvider for FakeProvider {
    fn init(&mut self, _ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        if self.fail_init {
            return Err(InitError::Unavailable(format!("{} backend offline", self.kind)));
        }
        self.log.push(Call::Init(self.kind));
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        self.log.push(Call::Dispose(self.kind));
        if self.fail_dispose {
            anyhow::bail!("{} refused to shut down", self.kind);
        }
        Ok(())
    }
}

#[async_trait]
impl NameResolver for FakeProvider {
    async fn resolve(&self, _host: &str) -> anyhow::Result<Vec<IpAddr>> {
        Ok(vec![IpAddr::from([192, 0, 2, 1])])
    }
}

impl LocationResolver for FakeProvider {
    fn locate(&self, _ip: IpAddr) -> Option<Location> {
        None
    }
}

#[async_trait]
impl DirectoryResolver for FakeProvider {
    async fn query(&self, name: &str) -> anyhow::Result<String> {
        Ok(format!("domain: {name}\n"))
    }
}

impl AddressAutocomplete for FakeProvider {
    fn suggest(&self, _prefix: &str, _limit: usize) -> Vec<String> {
        Vec::new()
    }

    fn record(&self, _entry: &str) {}

    fn history(&self) -> Vec<String> {
        Vec::new()
    }
}
