//! Streaming connection lifecycle.
//!
//! A connection moves Open -> Active -> Closing -> Closed. [`StreamSession`]
//! collapses this onto a cancellation token: the token fires once on the
//! first close request (consumer disconnect, fetch failure, or the
//! zero-data replay case) and every later close is a no-op. Emission and
//! the closed-check are a single `select!`, so a send never races a close.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lockbete_telemetry::MetricsRecorder;

/// Per-connection lifecycle handle. Cheap to clone; all clones share the
/// same closed state.
#[derive(Clone, Default)]
pub struct StreamSession {
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }

    /// Requests close. Idempotent: the first call wins, repeats do nothing.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!("stream session closing");
        }
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Cancellation-aware inter-cycle sleep. Returns `false` when the
    /// session closed during the wait.
    pub async fn sleep(&self, interval: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }
}

/// Sending half of a stream: a bounded channel tied to a session.
///
/// Suppresses empty batches, drops sends after close, and treats a failed
/// enqueue (receiver vanished) as a disconnect.
pub struct Emitter<T> {
    tx: mpsc::Sender<Vec<T>>,
    session: StreamSession,
    metrics: MetricsRecorder,
}

/// Builds the emitter/receiver pair for one streaming connection.
pub fn batch_channel<T>(
    session: &StreamSession,
    metrics: MetricsRecorder,
    capacity: usize,
) -> (Emitter<T>, mpsc::Receiver<Vec<T>>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        Emitter {
            tx,
            session: session.clone(),
            metrics,
        },
        rx,
    )
}

impl<T> Emitter<T> {
    /// Pushes a batch onto the stream. Returns `false` once the session is
    /// closed; callers stop their poll loop on that.
    pub async fn emit(&self, batch: Vec<T>) -> bool {
        if batch.is_empty() {
            // Empty batches never reach the wire.
            return !self.session.is_closed();
        }
        if self.session.is_closed() {
            return false;
        }

        let rows = batch.len();
        tokio::select! {
            _ = self.session.closed() => false,
            sent = self.tx.send(batch) => match sent {
                Ok(()) => {
                    self.metrics.record_batch(rows);
                    true
                }
                Err(_) => {
                    self.session.close();
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let session = StreamSession::new();
        assert!(!session.is_closed());
        session.close();
        session.close();
        session.close();
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn clones_share_closed_state() {
        let session = StreamSession::new();
        let other = session.clone();
        other.close();
        assert!(session.is_closed());
        session.closed().await;
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_close() {
        let session = StreamSession::new();
        let waiter = session.clone();
        let handle = tokio::spawn(async move { waiter.sleep(Duration::from_secs(60)).await });
        session.close();
        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn empty_batches_are_suppressed() {
        let session = StreamSession::new();
        let (emitter, mut rx) = batch_channel::<u32>(&session, MetricsRecorder::new(), 4);
        assert!(emitter.emit(vec![]).await);
        assert!(emitter.emit(vec![1, 2]).await);
        assert_eq!(rx.recv().await.unwrap(), vec![1, 2]);
        // Nothing queued for the empty batch.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emission_after_close_is_dropped() {
        let session = StreamSession::new();
        let (emitter, mut rx) = batch_channel::<u32>(&session, MetricsRecorder::new(), 4);
        session.close();
        assert!(!emitter.emit(vec![1]).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_counts_as_disconnect() {
        let session = StreamSession::new();
        let (emitter, rx) = batch_channel::<u32>(&session, MetricsRecorder::new(), 4);
        drop(rx);
        assert!(!emitter.emit(vec![1]).await);
        assert!(session.is_closed());
    }
}
