//! Public status endpoint (`GET /status`).
//!
//! Safe to expose without authentication: gateway liveness and aggregate
//! call metrics only. Backend FQDNs, ports, and credentials never appear
//! here.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::GatewayState;

pub async fn status(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().as_secs();
    let stats = state.traffic.stats().await;
    let error_rate = if stats.total_requests == 0 {
        0.0_f64
    } else {
        stats.error_count as f64 / stats.total_requests as f64
    };

    Json(json!({
        "status": "ok",
        "uptime_secs": uptime_secs,
        "backends": state.config.host_fqdns().len(),
        "calls": {
            "total": stats.total_requests,
            "errors": stats.error_count,
            "error_rate": error_rate,
            "avg_latency_ms": stats.avg_latency_ms,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::{TrafficEntry, TrafficLog};

    #[tokio::test]
    async fn stats_reflect_pushed_entries() {
        let log = TrafficLog::new(10);
        log.push(TrafficEntry::new("system.listSystems".into(), 50, true));
        log.push(TrafficEntry::new("system.listSystems".into(), 80, false));

        let stats = log.stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.error_count, 1);
    }
}
