//! The gateway's error taxonomy.
//!
//! Unlike a plain `anyhow::Error` wrapper, [`GatewayError`] is a closed enum:
//! every request-path failure maps to exactly one HTTP status via
//! [`IntoResponse`], rather than folding everything to `500`. Startup-time
//! failures (config/spec loading, socket bind) stay on `anyhow::Result` in
//! `main.rs` — request errors and process errors are kept separate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("method `{method}` is missing required parameter `{param}`")]
    MissingParam { method: String, param: String },

    #[error("method `{method}` received {given} parameter(s), expected {expected}")]
    ArityMismatch {
        method: String,
        given: usize,
        expected: usize,
    },

    #[error("authentication against backend `{fqdn}` failed: {source}")]
    BackendAuth {
        fqdn: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("call to backend `{fqdn}` failed: {source}")]
    BackendCall {
        fqdn: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("virtual id {0} does not resolve to a known backend context")]
    IdRouting(i64),

    /// Startup-time configuration problems that surfaced mid-request (e.g. a
    /// duplicate context registration). Not part of the documented §7 table —
    /// only reachable before the gateway starts serving traffic.
    #[error("configuration error: {0}")]
    Config(#[source] anyhow::Error),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownMethod(_)
            | Self::MissingParam { .. }
            | Self::ArityMismatch { .. }
            | Self::IdRouting(_) => StatusCode::BAD_REQUEST,
            Self::BackendAuth { .. } | Self::BackendCall { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
