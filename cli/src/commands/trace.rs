use std::net::IpAddr;
use std::path::Path;

use anyhow::Context;
use colored::*;
use tracing::info;

use vtrace_core::tracer::{Hop, TracerVariant};

use crate::commands::Session;
use crate::terminal::{colors, print};

pub async fn trace(settings_path: &Path, host: &str, max_hops: u8) -> anyhow::Result<()> {
    let session = Session::start(settings_path)?;
    let result = run(&session, host, max_hops).await;
    if result.is_ok() {
        session.orchestrator.autocomplete().record(host);
        session.save()?;
    }
    session.finish();
    print::end_of_program();
    result
}

async fn run(session: &Session, host: &str, max_hops: u8) -> anyhow::Result<()> {
    let orch = &session.orchestrator;
    let tracer = orch.route_tracer();

    let addrs = orch.name_resolver().resolve(host).await?;
    // The embedded tracer only speaks ICMPv4.
    let target = match tracer.variant() {
        TracerVariant::Embedded => addrs.iter().find(|ip| ip.is_ipv4()),
        TracerVariant::External => addrs.first(),
    }
    .copied()
    .with_context(|| format!("{host} has no address this tracer can reach"))?;

    info!(%target, variant = %tracer.variant(), "tracing");
    print::header(&format!("route to {host} ({target})"));

    let hops = tracer.trace(target, max_hops).await?;
    if hops.is_empty() {
        print::no_results("hops");
    }
    for hop in &hops {
        print_hop(session, hop);
    }
    Ok(())
}

fn print_hop(session: &Session, hop: &Hop) {
    let Some(address) = hop.address else {
        print::aligned_line(&format!("{:>2}", hop.ttl), "*".color(colors::INACTIVE));
        return;
    };
    let color = match address {
        IpAddr::V4(_) => colors::IPV4_ADDR,
        IpAddr::V6(_) => colors::IPV6_ADDR,
    };
    let rtt = hop
        .rtt
        .map(|rtt| format!("{:.1} ms", rtt.as_secs_f64() * 1_000.0))
        .unwrap_or_else(|| "-".to_string());
    let location = session
        .orchestrator
        .location_resolver()
        .locate(address)
        .map(|loc| loc.to_string())
        .unwrap_or_default();
    print::aligned_line(
        &format!("{:>2}", hop.ttl),
        format!(
            "{} {} {}",
            address.to_string().color(color),
            rtt.color(colors::ACCENT),
            location.color(colors::TEXT_DEFAULT)
        ),
    );
}
