use pnet::datalink::NetworkInterface;
use vtrace_common::Purpose;
use vtrace_common::network::interface::{ViabilityError, check};
use vtrace_core::DeviceSnapshot;
use vtrace_integration_tests::net::{MockProbe, eth0, eth1, lo, tun0, veth0, wlan0};

fn host() -> Vec<NetworkInterface> {
    vec![lo(), eth0(), wlan0(), tun0(), eth1(), veth0()]
}

fn names(snapshot: &DeviceSnapshot, purpose: Purpose) -> Vec<String> {
    snapshot
        .devices_for(purpose)
        .into_iter()
        .map(|d| d.name().to_string())
        .collect()
}

#[test]
fn loopback_serves_only_sniffing() {
    assert_eq!(check(Purpose::RouteTrace, &lo()), Err(ViabilityError::IsLoopback));
    assert_eq!(check(Purpose::DirectoryLookup, &lo()), Err(ViabilityError::IsLoopback));
    assert_eq!(check(Purpose::PacketSniffer, &lo()), Ok(()));
}

#[test]
fn down_interface_serves_nothing() {
    for purpose in Purpose::ALL {
        assert_eq!(check(purpose, &eth1()), Err(ViabilityError::IsDown));
    }
}

#[test]
fn ipv6_only_interface_cannot_trace() {
    assert_eq!(check(Purpose::RouteTrace, &veth0()), Err(ViabilityError::NoRoutableIpv4));
    assert_eq!(check(Purpose::DirectoryLookup, &veth0()), Ok(()));
}

#[test]
fn tunnels_can_trace() {
    assert_eq!(check(Purpose::RouteTrace, &tun0()), Ok(()));
}

#[test]
fn snapshot_keeps_discovery_order_per_purpose() {
    let probe = MockProbe::new(host()).capturable(&["lo", "wlan0", "eth1", "veth0"]);
    let snapshot = DeviceSnapshot::enumerate(&probe);

    assert_eq!(snapshot.devices().len(), 6);
    assert_eq!(names(&snapshot, Purpose::RouteTrace), ["eth0", "wlan0", "tun0"]);
    assert_eq!(names(&snapshot, Purpose::PacketSniffer), ["lo", "wlan0", "veth0"]);
    assert_eq!(
        names(&snapshot, Purpose::DirectoryLookup),
        ["eth0", "wlan0", "tun0", "veth0"]
    );
}

#[test]
fn snapshot_without_raw_sockets_has_no_trace_devices() {
    let probe = MockProbe::new(host()).without_raw_sockets();
    let snapshot = DeviceSnapshot::enumerate(&probe);

    assert!(!snapshot.is_available(Purpose::RouteTrace));
    assert!(snapshot.is_available(Purpose::DirectoryLookup));
    assert!(!snapshot.is_available(Purpose::PacketSniffer));
}
