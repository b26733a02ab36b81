//! The dynamic XML-RPC value carried between the translator, the demultiplexer,
//! and the aggregator.
//!
//! None of those three components know the shape of a backend's reply ahead of
//! time, so they operate on this loosely-typed tree rather than on per-method
//! generated structs. `Map` is a `BTreeMap` rather than a `HashMap` so that two
//! equal replies always compare and serialize identically — the aggregator's
//! determinism guarantee depends on it.

use std::collections::BTreeMap;

/// A dynamically-typed XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    /// ISO-8601-ish datetime, carried as the raw wire string. See
    /// `translator::coerce` for why this is never parsed further.
    DateTime(String),
    List(Vec<RpcValue>),
    Map(BTreeMap<String, RpcValue>),
}

impl RpcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::String(s) | RpcValue::DateTime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RpcValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RpcValue]> {
        match self {
            RpcValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RpcValue>> {
        match self {
            RpcValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RpcValue::Null)
    }
}

impl From<RpcValue> for serde_json::Value {
    fn from(v: RpcValue) -> Self {
        use serde_json::Value as J;
        match v {
            RpcValue::Null => J::Null,
            RpcValue::Bool(b) => J::Bool(b),
            RpcValue::Int(n) => J::Number(n.into()),
            RpcValue::String(s) => J::String(s),
            RpcValue::DateTime(s) => J::String(s),
            RpcValue::List(items) => J::Array(items.into_iter().map(Into::into).collect()),
            RpcValue::Map(map) => {
                let obj = map.into_iter().map(|(k, v)| (k, v.into())).collect();
                J::Object(obj)
            }
        }
    }
}
