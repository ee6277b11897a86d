use colored::*;
use pnet::ipnetwork::IpNetwork;

use vtrace_common::config::Settings;
use vtrace_common::{NetworkDevice, Purpose};
use vtrace_core::progress::NoProgress;
use vtrace_core::{CapabilityProvider, DeviceRegistry, PnetProbe, ProviderContext};

use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

/// Enumerates devices without starting the other providers.
pub fn devices() -> anyhow::Result<()> {
    let mut registry = DeviceRegistry::new(Box::new(PnetProbe));
    let settings = Settings::default();
    registry.init(&ProviderContext::new(&settings, &NoProgress))?;

    print::header("network devices");
    if registry.devices().is_empty() {
        print::no_results("devices");
    }
    for (idx, device) in registry.devices().iter().enumerate() {
        print::tree_head(idx, device.name());
        print::as_tree_one_level(details(device));
    }

    for purpose in Purpose::ALL {
        print::header(purpose.label());
        let usable = registry.devices_for(purpose);
        if usable.is_empty() {
            print::print_status("none".color(colors::INACTIVE).to_string());
        }
        for (position, device) in usable.iter().enumerate() {
            print::aligned_line(&position.to_string(), device.to_string());
        }
    }

    registry.dispose()?;
    print::end_of_program();
    Ok(())
}

fn details(device: &NetworkDevice) -> Vec<Detail> {
    let mut out: Vec<Detail> = vec![(
        "about".to_string(),
        device.description().color(colors::TEXT_DEFAULT),
    )];
    if let Some(mac) = device.mac() {
        out.push(("mac".to_string(), mac.to_string().color(colors::MAC_ADDR)));
    }
    for net in device.ips() {
        let (key, color) = match net {
            IpNetwork::V4(_) => ("ipv4", colors::IPV4_ADDR),
            IpNetwork::V6(_) => ("ipv6", colors::IPV6_ADDR),
        };
        out.push((key.to_string(), net.to_string().color(color)));
    }
    let serves: Vec<&str> = device.capabilities().iter().map(|p| p.label()).collect();
    let serves = if serves.is_empty() {
        "nothing".color(colors::INACTIVE)
    } else {
        serves.join(", ").color(colors::ACCENT)
    };
    out.push(("serves".to_string(), serves));
    out
}
