//! # Persisted Settings
//!
//! [`Settings`] is owned by whoever drives the orchestrator. It is handed to
//! `init` by mutable reference; the orchestrator reads the stored device
//! indices and only ever writes the OS traceroute fallback flag.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org:43";
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode settings")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to write settings to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    use_os_traceroute: bool,
    /// Position in the route-trace device list, not an OS interface index.
    traceroute_interface_index: usize,
    /// Position in the sniffer device list, not an OS interface index.
    sniffer_interface_index: usize,
    whois_server: String,
    geo_database: Option<PathBuf>,
    lookup_timeout_ms: u64,
    history: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_os_traceroute: false,
            traceroute_interface_index: 0,
            sniffer_interface_index: 0,
            whois_server: DEFAULT_WHOIS_SERVER.to_string(),
            geo_database: None,
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            history: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, text).map_err(write_err)
    }

    pub fn use_os_traceroute(&self) -> bool {
        self.use_os_traceroute
    }

    pub fn set_use_os_traceroute(&mut self, value: bool) {
        self.use_os_traceroute = value;
    }

    pub fn traceroute_interface_index(&self) -> usize {
        self.traceroute_interface_index
    }

    pub fn set_traceroute_interface_index(&mut self, index: usize) {
        self.traceroute_interface_index = index;
    }

    pub fn sniffer_interface_index(&self) -> usize {
        self.sniffer_interface_index
    }

    pub fn set_sniffer_interface_index(&mut self, index: usize) {
        self.sniffer_interface_index = index;
    }

    pub fn whois_server(&self) -> &str {
        &self.whois_server
    }

    pub fn set_whois_server(&mut self, server: impl Into<String>) {
        self.whois_server = server.into();
    }

    pub fn geo_database(&self) -> Option<&Path> {
        self.geo_database.as_deref()
    }

    pub fn set_geo_database(&mut self, path: Option<PathBuf>) {
        self.geo_database = path;
    }

    pub fn lookup_timeout_ms(&self) -> u64 {
        self.lookup_timeout_ms
    }

    pub fn set_lookup_timeout_ms(&mut self, timeout_ms: u64) {
        self.lookup_timeout_ms = timeout_ms;
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn set_history(&mut self, history: Vec<String>) {
        self.history = history;
    }
}
