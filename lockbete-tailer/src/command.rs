//! Composite-cursor tailer over command events, with geo enrichment.
//!
//! The first cycle delivers backlog: the most recent N rows, fetched newest
//! first and re-ascended so the consumer sees them oldest first. The cursor
//! then advances over a composite (timestamp, id) key with a strict tuple
//! comparison, so rows sharing a timestamp at the cursor boundary are
//! neither skipped nor duplicated. While the cursor is unset (an empty
//! store at open), each cycle re-runs the initial-batch query.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use lockbete_core::cursor::SeqCursor;
use lockbete_core::events::{CommandEvent, EnrichedCommand};
use lockbete_geo::GeoResolver;
use lockbete_store::EventStore;
use lockbete_telemetry::{EventLogger, MetricsRecorder};

use crate::session::{Emitter, StreamSession};

pub struct CommandTailer {
    store: Arc<dyn EventStore>,
    geo: Arc<GeoResolver>,
    poll_interval: Duration,
    initial_batch: u32,
    metrics: MetricsRecorder,
    cursor: Option<SeqCursor>,
}

impl CommandTailer {
    pub fn new(
        store: Arc<dyn EventStore>,
        geo: Arc<GeoResolver>,
        poll_interval: Duration,
        initial_batch: u32,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            store,
            geo,
            poll_interval,
            initial_batch,
            metrics,
            cursor: None,
        }
    }

    async fn fetch(&self) -> Result<Vec<CommandEvent>, lockbete_store::StoreError> {
        match self.cursor {
            Some(cursor) => self.store.commands_after(cursor).await,
            None => {
                let mut rows = self.store.recent_commands(self.initial_batch).await?;
                // Fetched newest-first; deliver oldest-first.
                rows.reverse();
                Ok(rows)
            }
        }
    }

    /// Poll/sleep cycle for one connection. Store failure closes the
    /// stream; geo failures degrade to unannotated rows inside the
    /// resolver.
    pub async fn run(mut self, session: StreamSession, emitter: Emitter<EnrichedCommand>) {
        self.metrics.open_streams.inc();
        EventLogger::stream_event("commands", "opened");

        while !session.is_closed() {
            let rows = match self.fetch().await {
                Ok(rows) => rows,
                Err(err) => {
                    error!(error = %err, "command tail fetch failed, closing stream");
                    self.metrics.store_failures.inc();
                    break;
                }
            };
            if session.is_closed() {
                break;
            }

            if !rows.is_empty() {
                // Maximum key across the batch, not the last row.
                let max = rows.iter().map(CommandEvent::cursor).max();
                let batch = self.enrich(rows);
                if !emitter.emit(batch).await {
                    break;
                }
                if let Some(max) = max {
                    match &mut self.cursor {
                        Some(cursor) => {
                            cursor.advance_to(max);
                        }
                        None => self.cursor = Some(max),
                    }
                }
            }

            if !session.sleep(self.poll_interval).await {
                break;
            }
        }

        session.close();
        self.metrics.open_streams.dec();
        EventLogger::stream_event("commands", "closed");
    }

    /// Annotates each row with its source location. Resolution order does
    /// not matter; batch order is preserved.
    fn enrich(&self, rows: Vec<CommandEvent>) -> Vec<EnrichedCommand> {
        rows.into_iter()
            .map(|event| {
                let geo = self.geo.lookup(&event.src_ip);
                EnrichedCommand { event, geo }
            })
            .collect()
    }
}
