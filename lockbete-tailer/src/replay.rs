//! Time-windowed replay tailer.
//!
//! Reconstructs a live-looking feed from history: anchors at the earliest
//! stored command timestamp, then walks fixed virtual windows
//! `[cursor, cursor + window)` ascending, sleeping a shorter real interval
//! between windows. The defaults replay one minute of history every ten
//! real seconds. Empty windows are suppressed; an empty store closes the
//! stream immediately without emitting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use lockbete_core::events::CommandEvent;
use lockbete_store::EventStore;
use lockbete_telemetry::{EventLogger, MetricsRecorder};

use crate::session::{Emitter, StreamSession};

pub struct ReplayTailer {
    store: Arc<dyn EventStore>,
    window: chrono::Duration,
    interval: Duration,
    metrics: MetricsRecorder,
}

impl ReplayTailer {
    pub fn new(
        store: Arc<dyn EventStore>,
        window_secs: u64,
        interval: Duration,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            store,
            window: chrono::Duration::seconds(window_secs as i64),
            interval,
            metrics,
        }
    }

    /// Window walk for one connection. No terminal condition besides the
    /// session closing: past the end of history the walk continues over
    /// empty (suppressed) windows.
    pub async fn run(self, session: StreamSession, emitter: Emitter<CommandEvent>) {
        self.metrics.open_streams.inc();
        EventLogger::stream_event("replay", "opened");

        if let Some(anchor) = self.anchor().await {
            self.walk(anchor, &session, emitter).await;
        }

        session.close();
        self.metrics.open_streams.dec();
        EventLogger::stream_event("replay", "closed");
    }

    /// Earliest stored timestamp, or `None` when there is nothing to walk
    /// (empty store, or the anchor query failed).
    async fn anchor(&self) -> Option<DateTime<Utc>> {
        match self.store.earliest_command_ts().await {
            Ok(Some(anchor)) => {
                info!(anchor = %anchor, "replay anchored");
                Some(anchor)
            }
            Ok(None) => {
                info!("no stored commands, replay has nothing to walk");
                None
            }
            Err(err) => {
                error!(error = %err, "replay anchor query failed, closing stream");
                self.metrics.store_failures.inc();
                None
            }
        }
    }

    async fn walk(
        &self,
        anchor: DateTime<Utc>,
        session: &StreamSession,
        emitter: Emitter<CommandEvent>,
    ) {
        let mut cursor_ts = anchor;
        while !session.is_closed() {
            let next_ts = cursor_ts + self.window;
            let rows = match self.store.commands_in_window(cursor_ts, next_ts).await {
                Ok(rows) => rows,
                Err(err) => {
                    error!(error = %err, "replay window fetch failed, closing stream");
                    self.metrics.store_failures.inc();
                    break;
                }
            };
            if session.is_closed() {
                break;
            }

            if !emitter.emit(rows).await {
                break;
            }
            cursor_ts = next_ts;

            if !session.sleep(self.interval).await {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::batch_channel;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use lockbete_core::cursor::SeqCursor;
    use lockbete_core::events::AuthAttempt;
    use lockbete_store::{NewAuthAttempt, NewCommand, SqliteStore, StoreError};
    use parking_lot::Mutex;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn command(at: i64, text: &str) -> NewCommand {
        NewCommand {
            session_id: "s-01".into(),
            ts: ts(at),
            src_ip: "203.0.113.9".into(),
            command: text.into(),
            failed: None,
        }
    }

    /// Delegating store that records every window queried.
    struct RecordingStore {
        inner: SqliteStore,
        windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl EventStore for RecordingStore {
        async fn auth_attempts_after(&self, last_id: i64) -> Result<Vec<AuthAttempt>, StoreError> {
            self.inner.auth_attempts_after(last_id).await
        }
        async fn recent_commands(&self, limit: u32) -> Result<Vec<CommandEvent>, StoreError> {
            self.inner.recent_commands(limit).await
        }
        async fn commands_after(&self, cursor: SeqCursor) -> Result<Vec<CommandEvent>, StoreError> {
            self.inner.commands_after(cursor).await
        }
        async fn commands_in_window(
            &self,
            lo: DateTime<Utc>,
            hi: DateTime<Utc>,
        ) -> Result<Vec<CommandEvent>, StoreError> {
            self.windows.lock().push((lo, hi));
            self.inner.commands_in_window(lo, hi).await
        }
        async fn earliest_command_ts(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
            self.inner.earliest_command_ts().await
        }
        async fn commands_desc(&self, limit: Option<u32>) -> Result<Vec<CommandEvent>, StoreError> {
            self.inner.commands_desc(limit).await
        }
        async fn insert_command(&self, cmd: NewCommand) -> Result<i64, StoreError> {
            self.inner.insert_command(cmd).await
        }
        async fn insert_auth_attempt(&self, a: NewAuthAttempt) -> Result<i64, StoreError> {
            self.inner.insert_auth_attempt(a).await
        }
    }

    #[tokio::test]
    async fn windows_advance_in_fixed_steps_from_the_anchor() {
        let store = Arc::new(RecordingStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            windows: Mutex::new(Vec::new()),
        });
        // Anchor at t=1700000000; data spread over three minutes.
        let t0 = 1_700_000_000;
        store.insert_command(command(t0, "one")).await.unwrap();
        store.insert_command(command(t0 + 70, "two")).await.unwrap();
        store.insert_command(command(t0 + 130, "three")).await.unwrap();

        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 8);
        let tailer = ReplayTailer::new(store.clone(), 60, Duration::from_millis(5), metrics);
        let task = tokio::spawn(tailer.run(session.clone(), emitter));

        // One batch per populated minute, in virtual order.
        assert_eq!(rx.recv().await.unwrap()[0].command, "one");
        assert_eq!(rx.recv().await.unwrap()[0].command, "two");
        assert_eq!(rx.recv().await.unwrap()[0].command, "three");

        session.close();
        task.await.unwrap();

        // The k-th fetch queried [T0 + 60k, T0 + 60(k+1)).
        let windows = store.windows.lock();
        for (k, (lo, hi)) in windows.iter().take(3).enumerate() {
            assert_eq!(*lo, ts(t0 + 60 * k as i64));
            assert_eq!(*hi, ts(t0 + 60 * (k as i64 + 1)));
        }
    }

    #[tokio::test]
    async fn empty_store_terminates_without_emitting() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 8);

        ReplayTailer::new(store, 60, Duration::from_millis(5), metrics)
            .run(session.clone(), emitter)
            .await;

        assert!(session.is_closed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn gap_minutes_are_suppressed() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let t0 = 1_700_000_000;
        store.insert_command(command(t0, "one")).await.unwrap();
        // Two-minute silence, then more data in the fourth window.
        store.insert_command(command(t0 + 185, "late")).await.unwrap();

        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 8);
        let task = tokio::spawn(
            ReplayTailer::new(store, 60, Duration::from_millis(2), metrics)
                .run(session.clone(), emitter),
        );

        assert_eq!(rx.recv().await.unwrap()[0].command, "one");
        // Next message skips straight to the populated window.
        assert_eq!(rx.recv().await.unwrap()[0].command, "late");

        session.close();
        task.await.unwrap();
    }
}
