//! Captured honeypot event types and their wire representations.
//!
//! Field names mirror the store schema (`src_ip`, `session_id`, `ts`) so
//! serialized batches match what the dashboard consumes directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::SeqCursor;

/// One observed shell command inside a honeypot session.
///
/// Rows are append-only: once inserted they are never updated or deleted,
/// which is what makes cursor-based tailing sound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Storage row identity. Unique, but not a stable business key.
    pub id: i64,
    /// Groups events belonging to one honeypot session.
    pub session_id: String,
    /// Event time. Non-decreasing in insertion order; ties are possible.
    pub ts: DateTime<Utc>,
    pub src_ip: String,
    /// Raw captured command text.
    pub command: String,
    /// Tri-state: the sensor may not know whether the command failed.
    pub failed: Option<bool>,
}

impl CommandEvent {
    /// Composite poll position of this row: (timestamp, row id).
    pub fn cursor(&self) -> SeqCursor {
        SeqCursor {
            ts_ms: self.ts.timestamp_millis(),
            id: self.id,
        }
    }
}

/// One observed login attempt against the honeypot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthAttempt {
    /// Strictly increasing integer assigned in insertion order. This is the
    /// cursor correctness precondition for the id-cursor tailer.
    pub id: i64,
    pub src_ip: String,
    pub username: String,
    pub password: String,
    pub success: bool,
    pub ts: DateTime<Utc>,
}

/// Geographic annotation derived from a source IP. Never stored; attached
/// to command events at emission time. Private/loopback addresses never
/// annotate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoAnnotation {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// A command event as emitted on the stream: the stored row plus its
/// optional geo annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCommand {
    #[serde(flatten)]
    pub event: CommandEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoAnnotation>,
}
