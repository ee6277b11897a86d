use vtrace_common::Purpose;
use vtrace_common::config::Settings;
use vtrace_core::{LifecycleState, Orchestrator, OrchestratorError, ProviderKind};
use vtrace_integration_tests::fakes::{Call, CallLog, FakeProvider};
use vtrace_integration_tests::net::{MockProbe, eth0, lo, wlan0};

use ProviderKind::*;

struct Fakes {
    name: FakeProvider,
    location: FakeProvider,
    directory: FakeProvider,
    autocomplete: FakeProvider,
}

impl Fakes {
    fn new(log: &CallLog) -> Self {
        Self {
            name: FakeProvider::new(NameResolver, log),
            location: FakeProvider::new(LocationResolver, log),
            directory: FakeProvider::new(DirectoryResolver, log),
            autocomplete: FakeProvider::new(AddressAutocomplete, log),
        }
    }

    fn build(self, probe: MockProbe) -> Orchestrator {
        Orchestrator::builder()
            .probe(Box::new(probe))
            .name_resolver(self.name.boxed())
            .location_resolver(self.location.boxed())
            .directory_resolver(self.directory.boxed())
            .autocomplete(self.autocomplete.boxed())
            .build()
    }
}

const INIT_ORDER: [ProviderKind; 7] = [
    NameResolver,
    LocationResolver,
    DeviceRegistry,
    RouteTracer,
    PacketSniffer,
    AddressAutocomplete,
    DirectoryResolver,
];

fn reversed(kinds: &[ProviderKind]) -> Vec<ProviderKind> {
    kinds.iter().rev().copied().collect()
}

fn host() -> MockProbe {
    MockProbe::new(vec![lo(), eth0(), wlan0()]).capturable(&["eth0"])
}

#[test]
fn providers_initialize_in_step_order() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(host());

    orch.init(&mut Settings::default()).unwrap();

    assert_eq!(orch.state(), LifecycleState::Ready);
    assert_eq!(
        log.initialized(),
        [NameResolver, LocationResolver, AddressAutocomplete, DirectoryResolver]
    );
    assert_eq!(orch.initialized_providers(), INIT_ORDER);
}

#[test]
fn dispose_runs_in_reverse_init_order() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(host());
    orch.init(&mut Settings::default()).unwrap();

    let failures = orch.dispose();

    assert!(failures.is_empty());
    assert_eq!(orch.state(), LifecycleState::Disposed);
    assert_eq!(
        log.disposed(),
        [DirectoryResolver, AddressAutocomplete, LocationResolver, NameResolver]
    );
    assert_eq!(orch.disposed_providers(), reversed(&INIT_ORDER));
}

#[test]
fn dispose_continues_past_a_failing_provider() {
    let log = CallLog::new();
    let mut fakes = Fakes::new(&log);
    fakes.autocomplete = fakes.autocomplete.failing_dispose();
    let mut orch = fakes.build(host());
    orch.init(&mut Settings::default()).unwrap();

    let failures = orch.dispose();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, AddressAutocomplete);
    assert!(failures[0].source.to_string().contains("refused to shut down"));
    assert_eq!(
        log.disposed(),
        [DirectoryResolver, AddressAutocomplete, LocationResolver, NameResolver]
    );
    assert_eq!(orch.disposed_providers(), reversed(&INIT_ORDER));
    assert_eq!(orch.state(), LifecycleState::Disposed);
}

#[test]
fn failing_dispose_between_built_in_providers_is_isolated() {
    let log = CallLog::new();
    let mut fakes = Fakes::new(&log);
    fakes.location = fakes.location.failing_dispose();
    let mut orch = fakes.build(host());
    orch.init(&mut Settings::default()).unwrap();

    let failures = orch.dispose();

    let failed: Vec<ProviderKind> = failures.iter().map(|f| f.provider).collect();
    assert_eq!(failed, [LocationResolver]);
    // The registry is released before the failing resolver, the name
    // resolver after it.
    assert_eq!(
        orch.disposed_providers(),
        [
            DirectoryResolver,
            AddressAutocomplete,
            PacketSniffer,
            RouteTracer,
            DeviceRegistry,
            LocationResolver,
            NameResolver
        ]
    );
    assert_eq!(log.disposed().last(), Some(&NameResolver));
    assert_eq!(orch.state(), LifecycleState::Disposed);
}

#[test]
fn second_dispose_releases_nothing() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(host());
    orch.init(&mut Settings::default()).unwrap();

    orch.dispose();
    let calls = log.calls().len();
    assert!(orch.dispose().is_empty());
    assert_eq!(log.calls().len(), calls);
    assert_eq!(orch.disposed_providers().len(), INIT_ORDER.len());
}

#[test]
fn init_failure_names_the_provider_and_keeps_state() {
    let log = CallLog::new();
    let mut fakes = Fakes::new(&log);
    fakes.location = fakes.location.failing_init();
    let mut orch = fakes.build(host());
    let mut settings = Settings::default();

    let err = orch.init(&mut settings).unwrap_err();

    match &err {
        OrchestratorError::Init { provider, .. } => assert_eq!(*provider, LocationResolver),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "failed to initialize location resolver");
    assert_eq!(orch.state(), LifecycleState::Initializing);
    assert_eq!(log.initialized(), [NameResolver]);
    assert!(orch.registry().devices().is_empty());
    assert!(!settings.use_os_traceroute());
}

#[test]
fn dispose_after_failed_init_releases_only_initialized_providers() {
    let log = CallLog::new();
    let mut fakes = Fakes::new(&log);
    fakes.directory = fakes.directory.failing_init();
    let mut orch = fakes.build(host());

    assert!(matches!(
        orch.init(&mut Settings::default()),
        Err(OrchestratorError::Init {
            provider: DirectoryResolver,
            ..
        })
    ));
    // The registry did initialize before the failing step.
    assert_eq!(orch.registry().devices().len(), 3);

    assert!(orch.dispose().is_empty());
    assert_eq!(
        log.disposed(),
        [AddressAutocomplete, LocationResolver, NameResolver]
    );
    assert_eq!(
        orch.disposed_providers(),
        [
            AddressAutocomplete,
            PacketSniffer,
            RouteTracer,
            DeviceRegistry,
            LocationResolver,
            NameResolver
        ]
    );
    assert_eq!(orch.state(), LifecycleState::Disposed);
}

#[test]
fn init_is_rejected_outside_uninitialized() {
    let log = CallLog::new();
    let mut fakes = Fakes::new(&log);
    fakes.name = fakes.name.failing_init();
    let mut orch = fakes.build(host());
    let mut settings = Settings::default();

    assert!(orch.init(&mut settings).is_err());
    assert!(matches!(
        orch.init(&mut settings),
        Err(OrchestratorError::InvalidState {
            state: LifecycleState::Initializing,
            ..
        })
    ));

    orch.dispose();
    let err = orch.init(&mut settings).unwrap_err();
    assert_eq!(err.to_string(), "cannot initialize while disposed");
    assert!(log.calls().is_empty());
}

#[test]
fn accessors_stay_valid_after_dispose() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(host());
    orch.init(&mut Settings::default()).unwrap();
    let tracer_device = orch.route_tracer().bound_device().cloned();
    let sniffer_device = orch.packet_sniffer().bound_device().cloned();

    orch.dispose();

    assert_eq!(orch.registry().devices().len(), 3);
    assert!(orch.is_embedded_trace_available());
    assert!(orch.is_sniffer_available());
    assert_eq!(orch.route_tracer().bound_device().cloned(), tracer_device);
    assert!(orch.packet_sniffer().bound_device().is_some() == sniffer_device.is_some());
    assert_eq!(orch.selected_device(Purpose::RouteTrace), Some(0));
    assert!(orch.autocomplete().suggest("", 5).is_empty());
}

#[tokio::test]
async fn injected_resolvers_are_served() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(host());
    orch.init(&mut Settings::default()).unwrap();

    let addrs = orch.name_resolver().resolve("example.org").await.unwrap();
    assert_eq!(addrs, [std::net::IpAddr::from([192, 0, 2, 1])]);
    let answer = orch.directory_resolver().query("example.org").await.unwrap();
    assert_eq!(answer, "domain: example.org\n");
    assert!(orch.location_resolver().locate(addrs[0]).is_none());

    orch.dispose();
}

#[test]
fn unreadable_host_falls_back_without_failing() {
    let log = CallLog::new();
    let mut orch = Fakes::new(&log).build(MockProbe::failing());
    let mut settings = Settings::default();

    orch.init(&mut settings).unwrap();

    assert_eq!(orch.state(), LifecycleState::Ready);
    assert!(orch.registry().devices().is_empty());
    assert!(!orch.is_embedded_trace_available());
    assert!(!orch.is_sniffer_available());
    assert!(settings.use_os_traceroute());
    assert!(!orch.packet_sniffer().is_active());
}
