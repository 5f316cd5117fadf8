//! Structured logging with tracing.
//!
//! One `init()` call at process start wires the subscriber; everything else
//! logs through the `tracing` macros with structured fields.

use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides the default
    /// `info` filter.
    pub fn init() {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .init()
    }

    /// Logs one stream lifecycle event with its connection label.
    pub fn stream_event(stream: &str, event_type: &str) {
        info!(stream, event_type, "stream lifecycle event");
    }
}
