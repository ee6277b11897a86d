use std::path::Path;

use colored::*;

use vtrace_common::Purpose;
use vtrace_core::Orchestrator;
use vtrace_core::tracer::TracerVariant;

use crate::commands::Session;
use crate::terminal::{colors, print};

pub fn status(settings_path: &Path) -> anyhow::Result<()> {
    let session = Session::start(settings_path)?;
    print_selection(&session);
    session.finish();
    print::end_of_program();
    Ok(())
}

/// Shared by `status` and `select`.
pub fn print_selection(session: &Session) {
    let orch: &Orchestrator = &session.orchestrator;
    print::header("providers");

    let tracer = orch.route_tracer();
    let tracer_device = tracer
        .bound_device()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "os traceroute".to_string());
    print::aligned_line(
        "route tracer",
        format!("{} ({})", tracer.variant(), tracer_device),
    );

    let sniffer = match orch.packet_sniffer().bound_device() {
        Some(device) => format!("active ({device})").color(colors::PRIMARY),
        None => "inert".color(colors::INACTIVE),
    };
    print::aligned_line("packet sniffer", sniffer);

    print::header("capabilities");
    print::aligned_line("embedded tracing", yes_no(orch.is_embedded_trace_available()));
    print::aligned_line("sniffing", yes_no(orch.is_sniffer_available()));
    print::aligned_line(
        "last forced fallback",
        fallback_note(session.settings.use_os_traceroute(), tracer.variant()),
    );
    for purpose in [Purpose::RouteTrace, Purpose::PacketSniffer] {
        let selected = orch
            .selected_device(purpose)
            .map(|idx| idx.to_string())
            .unwrap_or_else(|| "-".to_string());
        print::aligned_line(&format!("{} device", purpose.label()), selected);
    }
}

/// The stored flag records that some init had to force the OS traceroute. It
/// is not a preference and stays set until a route-trace device is selected.
fn fallback_note(forced: bool, variant: TracerVariant) -> &'static str {
    match (forced, variant) {
        (false, _) => "never",
        (true, TracerVariant::External) => "in effect",
        (true, TracerVariant::Embedded) => "earlier run, embedded tracer bound now",
    }
}

fn yes_no(value: bool) -> ColoredString {
    if value {
        "yes".color(colors::PRIMARY)
    } else {
        "no".color(colors::INACTIVE)
    }
}
