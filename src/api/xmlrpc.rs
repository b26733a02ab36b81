//! `/uyuni/<method>` — the gateway's single REST-to-XML-RPC entry point.
//!
//! The method name is derived from the path by replacing `/` with `.`
//! (`/uyuni/system/listSystems` → `system.listSystems`). `GET` requests take
//! their positional arguments from the query string; `POST` requests take
//! them from a form-encoded body, mirroring the two parameter sources the
//! XML-RPC handlers this gateway fronts have always accepted.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Form, Path, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{error::GatewayError, state::GatewayState, traffic::TrafficEntry, translator};

pub async fn call_method_get(
    State(state): State<Arc<GatewayState>>,
    Path(path): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, GatewayError> {
    dispatch(state, path, params).await
}

pub async fn call_method_post(
    State(state): State<Arc<GatewayState>>,
    Path(path): Path<String>,
    Form(params): Form<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, GatewayError> {
    dispatch(state, path, params).await
}

async fn dispatch(
    state: Arc<GatewayState>,
    path: String,
    params: BTreeMap<String, String>,
) -> Result<impl IntoResponse, GatewayError> {
    let method = path_to_method(&path);
    let started = std::time::Instant::now();

    let args = translator::translate(&state.registry, &method, &params)?;
    let result = state.demux.call(&method, &args).await;

    let latency_ms = started.elapsed().as_millis() as u64;
    let entry = match &result {
        Ok(outcome) => TrafficEntry::new(method.clone(), latency_ms, true)
            .with_backends(outcome.backends_called.clone(), outcome.backends_skipped.clone()),
        Err(e) => TrafficEntry::new(method.clone(), latency_ms, false).with_error(&e.to_string()),
    };
    state.traffic.push(entry);

    let outcome = result?;
    Ok(Json(serde_json::Value::from(outcome.value)))
}

fn path_to_method(path: &str) -> String {
    path.trim_start_matches('/').replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_to_method_joins_segments_with_dots() {
        assert_eq!(path_to_method("system/listSystems"), "system.listSystems");
        assert_eq!(path_to_method("/system/listSystems"), "system.listSystems");
        assert_eq!(path_to_method("auth.login"), "auth.login");
    }
}
