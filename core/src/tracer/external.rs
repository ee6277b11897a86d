//! Fallback tracer that shells out to the operating system's traceroute.

use std::env;
use std::ffi::OsStr;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

#[cfg(windows)]
const CANDIDATES: &[&str] = &["tracert.exe"];
#[cfg(not(windows))]
const CANDIDATES: &[&str] = &["traceroute"];

/// One line of traceroute output.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub ttl: u8,
    /// `None` when every probe for this TTL timed out.
    pub address: Option<IpAddr>,
    /// First measured round-trip time.
    pub rtt: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalTracer {
    program: Option<PathBuf>,
}

impl ExternalTracer {
    /// A tracer that has not looked for its program yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    pub(super) fn init(&mut self) {
        if self.program.is_none() {
            self.program = find_program(env::var_os("PATH").as_deref());
        }
        match &self.program {
            Some(program) => info!(program = %program.display(), "external tracer ready"),
            None => warn!("no traceroute program found on PATH"),
        }
    }

    pub(super) fn dispose(&mut self) {
        debug!("external tracer released");
    }

    /// Builds the traceroute invocation, optionally pinned to an interface.
    pub fn command(
        &self,
        target: &str,
        max_hops: u8,
        interface: Option<&str>,
    ) -> anyhow::Result<Command> {
        let Some(program) = &self.program else {
            bail!("no traceroute program available");
        };
        let mut command = Command::new(program);
        if cfg!(windows) {
            command.args(["-d", "-h", &max_hops.to_string()]);
        } else {
            command.args(["-n", "-m", &max_hops.to_string()]);
            if let Some(interface) = interface {
                command.args(["-i", interface]);
            }
        }
        command.arg(target);
        command.stdout(Stdio::piped()).stderr(Stdio::null());
        Ok(command)
    }

    /// Runs a full trace and parses every hop line.
    pub async fn trace(
        &self,
        target: &str,
        max_hops: u8,
        interface: Option<&str>,
    ) -> anyhow::Result<Vec<Hop>> {
        let output = self
            .command(target, max_hops, interface)?
            .output()
            .await
            .context("running traceroute")?;
        if !output.status.success() {
            bail!("traceroute exited with {}", output.status);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_hop).collect())
    }
}

/// First executable candidate on `path`.
fn find_program(path: Option<&OsStr>) -> Option<PathBuf> {
    let path = path?;
    let cwd = env::current_dir().ok()?;
    CANDIDATES
        .iter()
        .find_map(|name| which::which_in(name, Some(path), &cwd).ok())
}

/// Parses a hop line from `traceroute -n` or `tracert -d`.
///
/// Header and trailer lines yield `None`.
pub fn parse_hop(line: &str) -> Option<Hop> {
    let mut tokens = line.split_whitespace().peekable();
    let ttl: u8 = tokens.next()?.parse().ok()?;

    let mut address = None;
    let mut rtt = None;
    while let Some(token) = tokens.next() {
        if address.is_none() {
            if let Ok(ip) = token.trim_matches(|c| c == '(' || c == ')').parse::<IpAddr>() {
                address = Some(ip);
                continue;
            }
        }
        if rtt.is_none() && tokens.peek() == Some(&"ms") {
            if let Ok(ms) = token.trim_start_matches('<').parse::<f64>() {
                rtt = Some(Duration::from_micros((ms * 1_000.0).round() as u64));
            }
        }
    }

    Some(Hop { ttl, address, rtt })
}
