//! Id-cursor tailer over authentication attempts.
//!
//! Maintains an exclusive lower bound `last_id`, initially zero. Each cycle
//! fetches `id > last_id` ascending by timestamp, emits any rows as one
//! batch, and advances the cursor to the maximum id seen in the batch --
//! the maximum, not the last row, so any store ordering is tolerated.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use lockbete_core::cursor::IdCursor;
use lockbete_core::events::AuthAttempt;
use lockbete_store::EventStore;
use lockbete_telemetry::{EventLogger, MetricsRecorder};

use crate::session::{Emitter, StreamSession};

pub struct AuthTailer {
    store: Arc<dyn EventStore>,
    poll_interval: Duration,
    metrics: MetricsRecorder,
    cursor: IdCursor,
}

impl AuthTailer {
    pub fn new(
        store: Arc<dyn EventStore>,
        poll_interval: Duration,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            store,
            poll_interval,
            metrics,
            cursor: IdCursor::new(),
        }
    }

    /// Poll/sleep cycle for one connection. Runs until the session closes;
    /// a store failure is fatal to the connection and closes it.
    pub async fn run(mut self, session: StreamSession, emitter: Emitter<AuthAttempt>) {
        self.metrics.open_streams.inc();
        EventLogger::stream_event("auth", "opened");

        while !session.is_closed() {
            let rows = match self.store.auth_attempts_after(self.cursor.get()).await {
                Ok(rows) => rows,
                Err(err) => {
                    error!(error = %err, "auth tail fetch failed, closing stream");
                    self.metrics.store_failures.inc();
                    break;
                }
            };
            // A close observed mid-fetch discards the in-flight result.
            if session.is_closed() {
                break;
            }

            if !rows.is_empty() {
                let max_id = rows.iter().map(|r| r.id).max().unwrap_or(self.cursor.get());
                if !emitter.emit(rows).await {
                    break;
                }
                self.cursor.advance_to(max_id);
            }

            if !session.sleep(self.poll_interval).await {
                break;
            }
        }

        session.close();
        self.metrics.open_streams.dec();
        EventLogger::stream_event("auth", "closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::batch_channel;
    use chrono::{TimeZone, Utc};
    use lockbete_store::{NewAuthAttempt, SqliteStore};
    use tracing_test::traced_test;

    fn attempt(at: i64, user: &str) -> NewAuthAttempt {
        NewAuthAttempt {
            src_ip: "203.0.113.7".into(),
            username: user.into(),
            password: "123456".into(),
            success: false,
            ts: Utc.timestamp_opt(at, 0).unwrap(),
        }
    }

    fn short_poll() -> Duration {
        Duration::from_millis(5)
    }

    #[tokio::test]
    async fn emits_backlog_then_only_new_rows() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        for i in 0..5 {
            store.insert_auth_attempt(attempt(i, "root")).await.unwrap();
        }

        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 8);
        let tailer = AuthTailer::new(store.clone(), short_poll(), metrics);
        let task = tokio::spawn(tailer.run(session.clone(), emitter));

        // First cycle: all five rows, ids 1..=5.
        let first = rx.recv().await.unwrap();
        assert_eq!(first.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

        // New row appears; next batch carries only id 6.
        store.insert_auth_attempt(attempt(10, "admin")).await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.iter().map(|a| a.id).collect::<Vec<_>>(), vec![6]);

        session.close();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn quiet_store_produces_no_messages() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 8);
        let task = tokio::spawn(
            AuthTailer::new(store, short_poll(), metrics).run(session.clone(), emitter),
        );

        // Let several poll cycles pass with an empty table.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());

        session.close();
        task.await.unwrap();
    }

    #[traced_test]
    #[tokio::test]
    async fn lifecycle_transitions_are_logged() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, _rx) = batch_channel::<AuthAttempt>(&session, metrics.clone(), 8);

        session.close();
        AuthTailer::new(store, short_poll(), metrics)
            .run(session, emitter)
            .await;

        assert!(logs_contain("stream lifecycle event"));
    }

    #[tokio::test]
    async fn consumer_disconnect_stops_the_loop() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.insert_auth_attempt(attempt(0, "root")).await.unwrap();

        let session = StreamSession::new();
        let metrics = MetricsRecorder::new();
        let (emitter, rx) = batch_channel(&session, metrics.clone(), 8);
        drop(rx);

        AuthTailer::new(store, short_poll(), metrics.clone())
            .run(session.clone(), emitter)
            .await;
        assert!(session.is_closed());
        assert_eq!(metrics.open_streams.get(), 0);
    }
}
