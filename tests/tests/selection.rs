use vtrace_common::Purpose;
use vtrace_common::config::Settings;
use vtrace_core::tracer::TracerVariant;
use vtrace_core::{DeviceError, Orchestrator, OrchestratorError};
use vtrace_integration_tests::net::{MockProbe, eth0, eth1, lo, tun0, wlan0};

fn started(probe: MockProbe, settings: &mut Settings) -> Orchestrator {
    let mut orch = Orchestrator::builder().probe(Box::new(probe)).build();
    orch.init(settings).unwrap();
    orch
}

#[test]
fn no_route_trace_devices_forces_os_traceroute() {
    // eth0 carries OS index 2; raw sockets are refused on this host.
    let probe = MockProbe::new(vec![lo(), eth0()])
        .without_raw_sockets()
        .capturable(&["eth0"]);
    let mut settings = Settings::default();

    let orch = started(probe, &mut settings);

    assert!(settings.use_os_traceroute());
    assert_eq!(orch.route_tracer().variant(), TracerVariant::External);
    assert!(orch.route_tracer().bound_device().is_none());
    assert!(!orch.is_embedded_trace_available());
    assert!(orch.is_sniffer_available());
    assert_eq!(orch.packet_sniffer().bound_device().map(|d| d.index()), Some(2));
}

#[test]
fn valid_stored_index_binds_embedded_tracer() {
    let probe = MockProbe::new(vec![lo(), eth0(), wlan0()]);
    let mut settings = Settings::default();
    settings.set_traceroute_interface_index(1);

    let orch = started(probe, &mut settings);

    assert_eq!(orch.route_tracer().variant(), TracerVariant::Embedded);
    assert_eq!(orch.route_tracer().bound_device().map(|d| d.name()), Some("wlan0"));
    assert_eq!(orch.selected_device(Purpose::RouteTrace), Some(1));
    assert!(!settings.use_os_traceroute());
}

#[test]
fn stale_trace_index_falls_back_without_failing() {
    let probe = MockProbe::new(vec![eth0(), wlan0()]);
    let mut settings = Settings::default();
    settings.set_traceroute_interface_index(5);

    let orch = started(probe, &mut settings);

    assert!(orch.is_embedded_trace_available());
    assert_eq!(orch.route_tracer().variant(), TracerVariant::External);
    assert!(settings.use_os_traceroute());
    assert_eq!(orch.selected_device(Purpose::RouteTrace), None);
    // The stored index is left for the user to correct.
    assert_eq!(settings.traceroute_interface_index(), 5);
}

#[test]
fn stale_sniffer_index_leaves_sniffer_inert() {
    let probe = MockProbe::new(vec![eth0(), wlan0()]).capturable(&["eth0"]);
    let mut settings = Settings::default();
    settings.set_sniffer_interface_index(3);

    let orch = started(probe, &mut settings);

    assert!(orch.is_sniffer_available());
    assert!(!orch.packet_sniffer().is_active());
    assert_eq!(orch.selected_device(Purpose::PacketSniffer), None);
    assert_eq!(orch.route_tracer().variant(), TracerVariant::Embedded);
}

#[test]
fn no_capture_devices_leaves_sniffer_inert() {
    let probe = MockProbe::new(vec![eth0()]);
    let mut settings = Settings::default();

    let orch = started(probe, &mut settings);

    assert!(!orch.is_sniffer_available());
    assert!(!orch.packet_sniffer().is_active());
}

#[test]
fn capability_queries_follow_the_snapshot() {
    let probe = MockProbe::new(vec![lo(), eth0(), tun0(), eth1()]).capturable(&["tun0"]);
    let orch = started(probe, &mut Settings::default());

    for _ in 0..3 {
        assert_eq!(
            orch.is_embedded_trace_available(),
            orch.registry().is_available(Purpose::RouteTrace)
        );
        assert_eq!(
            orch.is_sniffer_available(),
            orch.registry().is_available(Purpose::PacketSniffer)
        );
    }
    assert_eq!(orch.registry().devices_for(Purpose::RouteTrace).len(), 2);
    assert_eq!(orch.registry().devices_for(Purpose::PacketSniffer).len(), 1);
}

#[test]
fn init_leaves_an_existing_fallback_flag_alone() {
    let probe = MockProbe::new(vec![eth0()]);
    let mut settings = Settings::default();
    settings.set_use_os_traceroute(true);

    let orch = started(probe, &mut settings);

    assert_eq!(orch.route_tracer().variant(), TracerVariant::Embedded);
    assert!(settings.use_os_traceroute());
}

#[test]
fn reselecting_the_tracer_restores_embedded_mode() {
    let probe = MockProbe::new(vec![eth0(), wlan0()]);
    let mut settings = Settings::default();
    settings.set_traceroute_interface_index(9);
    let mut orch = started(probe, &mut settings);
    assert_eq!(orch.route_tracer().variant(), TracerVariant::External);

    orch.select_device(Purpose::RouteTrace, 0, &mut settings).unwrap();

    assert_eq!(orch.route_tracer().variant(), TracerVariant::Embedded);
    assert_eq!(orch.route_tracer().bound_device().map(|d| d.name()), Some("eth0"));
    assert_eq!(settings.traceroute_interface_index(), 0);
    assert!(!settings.use_os_traceroute());
}

#[test]
fn invalid_reselection_keeps_the_previous_binding() {
    let probe = MockProbe::new(vec![eth0(), wlan0()]).capturable(&["eth0", "wlan0"]);
    let mut settings = Settings::default();
    let mut orch = started(probe, &mut settings);

    let err = orch
        .select_device(Purpose::PacketSniffer, 2, &mut settings)
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Device(DeviceError::InvalidDevice {
            purpose: Purpose::PacketSniffer,
            index: 2,
            available: 2,
        })
    ));
    assert_eq!(orch.packet_sniffer().bound_device().map(|d| d.name()), Some("eth0"));
    assert_eq!(settings.sniffer_interface_index(), 0);
}

#[test]
fn selection_survives_a_settings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let probe = MockProbe::new(vec![eth0(), wlan0()]).capturable(&["eth0", "wlan0"]);

    let mut settings = Settings::load(&path).unwrap();
    let mut orch = started(probe.clone(), &mut settings);
    orch.select_device(Purpose::PacketSniffer, 1, &mut settings).unwrap();
    orch.dispose();
    settings.save(&path).unwrap();

    let mut reloaded = Settings::load(&path).unwrap();
    let orch = started(probe, &mut reloaded);
    assert_eq!(orch.packet_sniffer().bound_device().map(|d| d.name()), Some("wlan0"));
}
