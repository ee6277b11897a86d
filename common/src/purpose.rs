//! # Operational Purposes
//!
//! A [`Purpose`] names one thing a network device may be used for. The set is
//! closed: new purposes are added as variants, never registered at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// In-process route tracing over a raw ICMP socket.
    RouteTrace,
    /// Raw packet capture on a datalink channel.
    PacketSniffer,
    /// WHOIS / directory queries.
    DirectoryLookup,
}

impl Purpose {
    /// Every purpose, in declaration order.
    pub const ALL: [Purpose; 3] = [
        Purpose::RouteTrace,
        Purpose::PacketSniffer,
        Purpose::DirectoryLookup,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Purpose::RouteTrace => "route trace",
            Purpose::PacketSniffer => "packet sniffer",
            Purpose::DirectoryLookup => "directory lookup",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Purpose::RouteTrace => 1,
            Purpose::PacketSniffer => 1 << 1,
            Purpose::DirectoryLookup => 1 << 2,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability flags of a single device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PurposeSet(u8);

impl PurposeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, purpose: Purpose) {
        self.0 |= purpose.bit();
    }

    pub fn with(mut self, purpose: Purpose) -> Self {
        self.insert(purpose);
        self
    }

    pub fn contains(&self, purpose: Purpose) -> bool {
        self.0 & purpose.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained purposes in [`Purpose::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = Purpose> + '_ {
        Purpose::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<Purpose> for PurposeSet {
    fn from_iter<I: IntoIterator<Item = Purpose>>(iter: I) -> Self {
        let mut set = PurposeSet::empty();
        for purpose in iter {
            set.insert(purpose);
        }
        set
    }
}
