//! Route table and handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lockbete_core::events::CommandEvent;
use lockbete_tailer::{batch_channel, AuthTailer, CommandTailer, ReplayTailer, StreamSession};

use crate::error::ApiError;
use crate::state::AppState;
use crate::stream::sse_response;

// Room for a few batches while the client drains; a full channel beyond
// this is treated as a vanished consumer.
const STREAM_CHANNEL_CAPACITY: usize = 16;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/commands", get(list_commands))
        .route("/api/commands/stream", get(command_stream))
        .route("/api/commands/replay", get(command_replay))
        .route("/api/auth/stream", get(auth_stream))
        .layer(TraceLayer::new_for_http())
        // The dashboard is served from a different origin.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CommandsQuery {
    /// Cap on returned rows; absent means the full table.
    limit: Option<u32>,
}

/// Full command table, newest first.
async fn list_commands(
    State(state): State<AppState>,
    Query(query): Query<CommandsQuery>,
) -> Result<Json<Vec<CommandEvent>>, ApiError> {
    let rows = state.store.commands_desc(query.limit).await?;
    Ok(Json(rows))
}

/// Live auth attempts, id-cursor tailed.
async fn auth_stream(State(state): State<AppState>) -> impl IntoResponse {
    let session = StreamSession::new();
    let (emitter, rx) = batch_channel(&session, state.metrics.clone(), STREAM_CHANNEL_CAPACITY);
    let tailer = AuthTailer::new(
        state.store.clone(),
        state.config.tailer.poll_interval(),
        state.metrics.clone(),
    );
    tokio::spawn(tailer.run(session.clone(), emitter));
    sse_response(session, rx)
}

/// Live command events with geo enrichment, composite-cursor tailed.
async fn command_stream(State(state): State<AppState>) -> impl IntoResponse {
    let session = StreamSession::new();
    let (emitter, rx) = batch_channel(&session, state.metrics.clone(), STREAM_CHANNEL_CAPACITY);
    let tailer = CommandTailer::new(
        state.store.clone(),
        state.geo.clone(),
        state.config.tailer.poll_interval(),
        state.config.tailer.initial_batch,
        state.metrics.clone(),
    );
    tokio::spawn(tailer.run(session.clone(), emitter));
    sse_response(session, rx)
}

/// Historical command replay at the configured acceleration.
async fn command_replay(State(state): State<AppState>) -> impl IntoResponse {
    let session = StreamSession::new();
    let (emitter, rx) = batch_channel(&session, state.metrics.clone(), STREAM_CHANNEL_CAPACITY);
    let tailer = ReplayTailer::new(
        state.store.clone(),
        state.config.tailer.replay.window_secs,
        state.config.tailer.replay.interval(),
        state.metrics.clone(),
    );
    tokio::spawn(tailer.run(session.clone(), emitter));
    sse_response(session, rx)
}

async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .earliest_command_ts()
        .await
        .map_err(ApiError::Unhealthy)?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(state.metrics.gather_metrics()?)
}
