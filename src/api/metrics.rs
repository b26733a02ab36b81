//! Prometheus-compatible `/metrics` endpoint.
//!
//! All metrics are derived from the in-memory ring-buffer window, so values
//! represent a sliding window of recent calls rather than lifetime counters
//! — use `TYPE gauge` throughout.
//!
//! Metric families:
//! - `uyuni_gw_window_size`        — entries currently in the ring buffer
//! - `uyuni_gw_calls`              — per-method/outcome call counts
//! - `uyuni_gw_latency_ms_sum`     — sum of latencies per method (for avg)
//! - `uyuni_gw_latency_ms_count`   — denominator matching the sum above
//! - `uyuni_gw_errors_total`       — calls that returned an error

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::state::GatewayState;

pub async fn metrics(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let entries = state.traffic.recent(usize::MAX).await;

    let window_size = entries.len();
    let mut errors: u64 = 0;
    let mut call_counts: HashMap<(String, bool), u64> = HashMap::new();
    let mut latency: HashMap<String, (u64, u64)> = HashMap::new();

    for e in &entries {
        if !e.success {
            errors += 1;
        }
        *call_counts.entry((e.method.clone(), e.success)).or_default() += 1;
        let lat = latency.entry(e.method.clone()).or_default();
        lat.0 += e.latency_ms;
        lat.1 += 1;
    }

    let mut out = String::with_capacity(1024);

    out.push_str("# HELP uyuni_gw_window_size Number of calls currently held in the ring-buffer window.\n");
    out.push_str("# TYPE uyuni_gw_window_size gauge\n");
    out.push_str(&format!("uyuni_gw_window_size {window_size}\n\n"));

    out.push_str("# HELP uyuni_gw_calls Call count in the current window, labelled by method and outcome.\n");
    out.push_str("# TYPE uyuni_gw_calls gauge\n");
    let mut call_rows: Vec<_> = call_counts.iter().collect();
    call_rows.sort_by(|a, b| a.0.cmp(b.0));
    for ((method, success), count) in call_rows {
        out.push_str(&format!(
            "uyuni_gw_calls{{method=\"{method}\",success=\"{success}\"}} {count}\n"
        ));
    }
    out.push('\n');

    out.push_str("# HELP uyuni_gw_latency_ms_sum Sum of call latency (ms) in the current window, by method.\n");
    out.push_str("# TYPE uyuni_gw_latency_ms_sum gauge\n");
    out.push_str("# HELP uyuni_gw_latency_ms_count Number of observations for the latency sum above.\n");
    out.push_str("# TYPE uyuni_gw_latency_ms_count gauge\n");
    let mut lat_rows: Vec<_> = latency.iter().collect();
    lat_rows.sort_by(|a, b| a.0.cmp(b.0));
    for (method, (sum, count)) in lat_rows {
        out.push_str(&format!("uyuni_gw_latency_ms_sum{{method=\"{method}\"}} {sum}\n"));
        out.push_str(&format!("uyuni_gw_latency_ms_count{{method=\"{method}\"}} {count}\n"));
    }
    out.push('\n');

    out.push_str("# HELP uyuni_gw_errors_total Calls that returned an error in the current window.\n");
    out.push_str("# TYPE uyuni_gw_errors_total gauge\n");
    out.push_str(&format!("uyuni_gw_errors_total {errors}\n"));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        out,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::traffic::{TrafficEntry, TrafficLog};

    fn mock_log() -> Arc<TrafficLog> {
        let log = Arc::new(TrafficLog::new(100));
        log.push(TrafficEntry::new("system.listSystems".into(), 120, true));
        log.push(TrafficEntry::new("system.listSystems".into(), 95, true));
        log.push(TrafficEntry::new("auth.login".into(), 30, true));
        log.push(TrafficEntry::new("system.listSystems".into(), 80, false).with_error("timeout"));
        log
    }

    #[tokio::test]
    async fn window_size_equals_entry_count() {
        let log = mock_log();
        let entries = log.recent(usize::MAX).await;
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn latency_sum_is_accurate_per_method() {
        let log = mock_log();
        let entries = log.recent(usize::MAX).await;
        let sum: u64 = entries
            .iter()
            .filter(|e| e.method == "system.listSystems")
            .map(|e| e.latency_ms)
            .sum();
        assert_eq!(sum, 295);
    }
}
