//! `/uyuni-spec/*` — read-only introspection of the loaded method spec.
//!
//! `GET /uyuni-spec/xmlrpc` lists every registered method and its positional
//! parameter names/types. Any other path under `/uyuni-spec/` is not a
//! recognized spec document and is rejected with `400`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{methodspec::ParamType, state::GatewayState};

pub async fn xmlrpc_spec(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let methods: Vec<_> = state
        .registry
        .methods()
        .map(|method| {
            let params = state
                .registry
                .params_of(method)
                .unwrap_or(&[])
                .iter()
                .map(|p| json!({ "name": p.name, "type": type_tag(p.ty) }))
                .collect::<Vec<_>>();
            json!({ method: params })
        })
        .collect();

    Json(json!({ "xmlrpc": methods }))
}

fn type_tag(ty: ParamType) -> &'static str {
    match ty {
        ParamType::Int => "int",
        ParamType::String => "string",
        ParamType::DateTime => "datetime",
        ParamType::SessionKey => "sessionKey",
    }
}

pub async fn unknown_spec() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "unknown spec document" })),
    )
}
