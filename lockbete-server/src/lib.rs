//! # lockbete-server
//!
//! HTTP surface of the honeypot monitor, built on Axum.
//!
//! # Endpoints
//!
//! - `GET /api/commands` - full command table, newest first (optional `limit`)
//! - `GET /api/commands/stream` - SSE: live command events, geo-enriched
//! - `GET /api/commands/replay` - SSE: accelerated historical replay
//! - `GET /api/auth/stream` - SSE: live authentication attempts
//! - `GET /healthz` - store reachability
//! - `GET /metrics` - Prometheus text exposition
//!
//! Each SSE connection owns one tailer task; the earlier of client
//! disconnect or store failure tears both down.

pub mod error;
pub mod routes;
pub mod state;
pub mod stream;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;

/// Binds `addr` and serves the API until the process is torn down.
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "lockbete API listening");
    axum::serve(listener, build_router(state)).await
}
