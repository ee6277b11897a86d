//! Address autocomplete backed by the persisted lookup history.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::InitError;
use crate::provider::{CapabilityProvider, ProviderContext};

/// Upper bound on remembered entries; the oldest are evicted first.
pub const HISTORY_CAPACITY: usize = 256;

pub trait AddressAutocomplete: CapabilityProvider + Sync {
    /// Up to `limit` remembered entries starting with `prefix`, most recent first.
    fn suggest(&self, prefix: &str, limit: usize) -> Vec<String>;

    /// Remembers `entry`, moving it to the front if it is already known.
    fn record(&self, entry: &str);

    /// Current history, most recent first.
    fn history(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct HistoryAutocomplete {
    entries: Mutex<Vec<String>>,
}

impl HistoryAutocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CapabilityProvider for HistoryAutocomplete {
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        let mut entries = self.entries();
        entries.clear();
        for entry in ctx.settings().history() {
            let entry = entry.trim();
            if !entry.is_empty() && !entries.iter().any(|e| e.eq_ignore_ascii_case(entry)) {
                entries.push(entry.to_string());
            }
        }
        entries.truncate(HISTORY_CAPACITY);
        debug!(entries = entries.len(), "autocomplete history loaded");
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        self.entries().clear();
        Ok(())
    }
}

impl AddressAutocomplete for HistoryAutocomplete {
    fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_ascii_lowercase();
        self.entries()
            .iter()
            .filter(|e| e.to_ascii_lowercase().starts_with(&prefix))
            .take(limit)
            .cloned()
            .collect()
    }

    fn record(&self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        let mut entries = self.entries();
        entries.retain(|e| !e.eq_ignore_ascii_case(entry));
        entries.insert(0, entry.to_string());
        entries.truncate(HISTORY_CAPACITY);
    }

    fn history(&self) -> Vec<String> {
        self.entries().clone()
    }
}
