//! API error types
//!
//! Store failures on the non-streaming endpoints are reported as a
//! structured JSON body with a server-error status instead of crashing the
//! handler. Streaming endpoints never surface errors this way; they close
//! the stream.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use lockbete_store::StoreError;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Event store query failed.
    #[error("failed to fetch events")]
    Store(#[from] StoreError),

    /// Metrics encoding failed.
    #[error("failed to gather metrics")]
    Metrics(#[from] prometheus::Error),

    /// Store unreachable during a health probe.
    #[error("event store unreachable")]
    Unhealthy(#[source] StoreError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(_) | Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unhealthy(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Store(err) => err.to_string(),
            Self::Metrics(err) => err.to_string(),
            Self::Unhealthy(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "detail": self.detail(),
        }));
        (self.status_code(), body).into_response()
    }
}
