pub mod complete;
pub mod devices;
pub mod resolve;
pub mod select;
pub mod sniff;
pub mod status;
pub mod trace;
pub mod whois;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};

use vtrace_common::Purpose;
use vtrace_common::config::Settings;
use vtrace_core::Orchestrator;
use vtrace_core::tracer::DEFAULT_MAX_HOPS;

use crate::terminal::spinner::SpinnerProgress;

#[derive(Parser)]
#[command(name = "vtrace")]
#[command(about = "A visual traceroute and network toolkit.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output; repeat for less
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List network devices and what each can be used for
    #[command(alias = "d")]
    Devices,
    /// Start every provider and show the resulting selection
    #[command(alias = "s")]
    Status,
    /// Choose the device used for tracing or sniffing
    #[command(alias = "x")]
    Select { purpose: SelectPurpose, index: usize },
    /// Trace the route to a host
    #[command(alias = "t")]
    Trace {
        host: String,
        /// Give up after this many hops
        #[arg(short, long, default_value_t = DEFAULT_MAX_HOPS)]
        max_hops: u8,
    },
    /// Capture frames on the selected sniffer device
    #[command(alias = "n")]
    Sniff {
        /// Stop after this many frames
        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },
    /// Resolve a host name and locate its addresses
    #[command(alias = "r")]
    Resolve { host: String },
    /// Query WHOIS for a domain, address or AS number
    #[command(alias = "w")]
    Whois { name: String },
    /// Suggest previously looked up addresses
    #[command(alias = "c")]
    Complete { prefix: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SelectPurpose {
    Trace,
    Sniff,
}

impl From<SelectPurpose> for Purpose {
    fn from(value: SelectPurpose) -> Self {
        match value {
            SelectPurpose::Trace => Purpose::RouteTrace,
            SelectPurpose::Sniff => Purpose::PacketSniffer,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Default settings location: `<config_dir>/vtrace/settings.toml`.
pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir().context("no user config directory on this platform")?;
    Ok(dir.join("vtrace").join("settings.toml"))
}

/// A running orchestrator plus the settings file it persists to.
pub struct Session {
    pub orchestrator: Orchestrator,
    pub settings: Settings,
    path: PathBuf,
}

impl Session {
    /// Loads settings, runs the full init and persists the fallback flag.
    pub fn start(path: &Path) -> anyhow::Result<Self> {
        let mut settings = Settings::load(path)?;
        let mut orchestrator = Orchestrator::builder()
            .progress(Arc::new(SpinnerProgress::new()))
            .build();

        if let Err(e) = orchestrator.init(&mut settings) {
            for failure in orchestrator.dispose() {
                warn!(error = %failure, "cleanup after failed startup");
            }
            return Err(e).context("startup failed");
        }

        let session = Self {
            orchestrator,
            settings,
            path: path.to_path_buf(),
        };
        session.save()?;
        Ok(session)
    }

    /// Writes the settings back, including the current lookup history.
    pub fn save(&self) -> anyhow::Result<()> {
        let mut settings = self.settings.clone();
        settings.set_history(self.orchestrator.autocomplete().history());
        settings.save(&self.path)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    pub fn finish(mut self) {
        for failure in self.orchestrator.dispose() {
            warn!(error = %failure, cause = %failure.source, "provider did not shut down cleanly");
        }
    }
}
