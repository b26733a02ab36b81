//! HTTP surface: the `/uyuni` and `/uyuni-spec` endpoints plus the ambient
//! `/healthz`, `/metrics`, and `/status` views, wired together with a
//! request-ID + trace-layer middleware stack.

pub mod health;
pub mod metrics;
pub mod request_id;
pub mod spec;
pub mod status;
pub mod xmlrpc;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/uyuni/*method", get(xmlrpc::call_method_get).post(xmlrpc::call_method_post))
        .route("/uyuni-spec/xmlrpc", get(spec::xmlrpc_spec))
        .route("/uyuni-spec/*rest", get(spec::unknown_spec))
        .route("/healthz", get(health::healthz))
        .route("/metrics", get(metrics::metrics))
        .route("/status", get(status::status))
        .with_state(state)
}
