use std::net::IpAddr;
use std::path::Path;

use colored::*;

use crate::commands::Session;
use crate::terminal::{colors, print};

pub async fn resolve(settings_path: &Path, host: &str) -> anyhow::Result<()> {
    let session = Session::start(settings_path)?;
    let result = lookup(&session, host).await;
    if result.is_ok() {
        session.orchestrator.autocomplete().record(host);
        session.save()?;
    }
    session.finish();
    print::end_of_program();
    result
}

async fn lookup(session: &Session, host: &str) -> anyhow::Result<()> {
    let orch = &session.orchestrator;
    let addrs = orch.name_resolver().resolve(host).await?;

    print::header(host);
    if addrs.is_empty() {
        print::no_results("addresses");
    }
    for (idx, ip) in addrs.iter().enumerate() {
        let color = match ip {
            IpAddr::V4(_) => colors::IPV4_ADDR,
            IpAddr::V6(_) => colors::IPV6_ADDR,
        };
        print::tree_head(idx, &ip.to_string().color(color).to_string());
        let location = match orch.location_resolver().locate(*ip) {
            Some(loc) => loc.to_string().color(colors::TEXT_DEFAULT),
            None => "unknown".color(colors::INACTIVE),
        };
        print::as_tree_one_level(vec![("location".to_string(), location)]);
    }
    Ok(())
}
