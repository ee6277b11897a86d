use std::sync::{Mutex, PoisonError};

use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use vtrace_core::progress::{
    STARTUP_DEVICES, STARTUP_NETWORK, STARTUP_PROVIDERS, STARTUP_READY, STARTUP_RESOLVERS,
    STARTUP_STEPS, StartupProgress,
};

use crate::terminal::colors;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Human text for a startup label key.
pub fn startup_label(label_key: &str) -> &str {
    match label_key {
        STARTUP_RESOLVERS => "loading resolvers",
        STARTUP_NETWORK => "enumerating network devices",
        STARTUP_PROVIDERS => "starting providers",
        STARTUP_DEVICES => "selecting devices",
        STARTUP_READY => "ready",
        other => other,
    }
}

/// Drives a step bar attached to a `startup` span. The span, and with it the
/// bar, is closed once the ready step is reported.
pub struct SpinnerProgress {
    span: Mutex<Option<Span>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let span = info_span!("startup");
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.blue} [{pos}/{len}] {msg}")
        {
            span.pb_set_style(&style.tick_strings(TICKS));
        }
        span.pb_set_length(STARTUP_STEPS);
        span.pb_start();
        Self {
            span: Mutex::new(Some(span)),
        }
    }
}

impl StartupProgress for SpinnerProgress {
    fn update_startup(&self, label_key: &str, increment_step: bool) {
        let mut guard = self.span.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(span) = guard.as_ref() else {
            return;
        };
        if increment_step {
            span.pb_inc(1);
        }
        let label = startup_label(label_key).color(colors::TEXT_DEFAULT).to_string();
        span.pb_set_message(&label);
        if label_key == STARTUP_READY {
            guard.take();
        }
    }
}
