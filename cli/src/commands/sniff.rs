use std::path::Path;

use anyhow::Context;
use colored::*;
use pnet::packet::ethernet::EthernetPacket;
use tracing::info;

use vtrace_core::sniffer::CapturedFrame;

use crate::commands::Session;
use crate::terminal::{colors, print};

pub async fn sniff(settings_path: &Path, count: usize) -> anyhow::Result<()> {
    let mut session = Session::start(settings_path)?;
    let result = capture(&mut session, count).await;
    session.finish();
    print::end_of_program();
    result
}

async fn capture(session: &mut Session, count: usize) -> anyhow::Result<()> {
    let sniffer = session.orchestrator.packet_sniffer_mut();
    let device = sniffer
        .bound_device()
        .map(|d| d.to_string())
        .context("no capture device available; run `vtrace devices` and `vtrace select sniff`")?;
    let mut frames = sniffer.start_capture()?;

    print::header(&format!("capturing on {device}"));
    let mut seen = 0;
    while seen < count {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                seen += 1;
                print_frame(seen, &frame);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    session.orchestrator.packet_sniffer_mut().stop_capture()?;
    info!(frames = seen, "capture finished");
    Ok(())
}

fn print_frame(n: usize, frame: &CapturedFrame) {
    let summary = match EthernetPacket::new(&frame.data) {
        Some(eth) => format!(
            "{} {} {} {}",
            eth.get_source().to_string().color(colors::MAC_ADDR),
            "→".color(colors::SEPARATOR),
            eth.get_destination().to_string().color(colors::MAC_ADDR),
            eth.get_ethertype().to_string().color(colors::ACCENT),
        ),
        None => "truncated frame".color(colors::INACTIVE).to_string(),
    };
    print::aligned_line(
        &format!("#{n} {} bytes", frame.data.len()),
        summary,
    );
}
