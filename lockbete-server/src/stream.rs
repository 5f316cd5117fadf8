//! Batch-channel to SSE adaptation.
//!
//! One SSE message per non-empty batch, each body a JSON array of row
//! objects. Dropping the response stream (client gone) closes the session,
//! which promptly stops the tailer task feeding it.

use std::convert::Infallible;

use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::error;

use lockbete_tailer::StreamSession;

/// Closes the session when the HTTP response stream is dropped.
struct SessionGuard(StreamSession);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Wraps a tailer's batch receiver as an SSE response.
pub fn sse_response<T: Serialize + Send + 'static>(
    session: StreamSession,
    rx: mpsc::Receiver<Vec<T>>,
) -> impl IntoResponse {
    let guard = SessionGuard(session);
    let events = batch_events(guard, rx);
    (
        // Explicit no-cache on top of the SSE content type: replies must
        // never be served from an intermediary cache.
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
}

fn batch_events<T: Serialize + Send + 'static>(
    guard: SessionGuard,
    rx: mpsc::Receiver<Vec<T>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((guard, rx), |(guard, mut rx)| async move {
        let batch = rx.recv().await?;
        match Event::default().json_data(&batch) {
            Ok(event) => Some((Ok(event), (guard, rx))),
            Err(err) => {
                // Serialization of our own row types failing is a bug, not
                // a client condition; end the stream.
                error!(error = %err, "failed to encode batch, closing stream");
                None
            }
        }
    })
}
