//! RPC demultiplexer: fans one logical call out to every backend it is
//! addressed to, concurrently, and hands the per-backend shards to the
//! aggregator.
//!
//! Per-backend dispatch is skipped when a routed integer argument names a
//! different backend's context, session tokens are materialized lazily and
//! only for backends actually dispatched to, and a recognized
//! authentication fault triggers exactly one retry after invalidating the
//! cached session. Dispatch order always follows
//! [`VidManager::list_contexts`] and failures are propagated as
//! [`GatewayError`] rather than causing a panic.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::{
    aggregator,
    backend::BackendClient,
    error::GatewayError,
    translator::Arg,
    value::RpcValue,
    vid::VidManager,
};

pub struct Demultiplexer {
    vid: Arc<VidManager>,
    clients: BTreeMap<String, BackendClient>,
}

/// The result of one demultiplexed call, with enough detail for the
/// traffic log to record which backends actually participated.
pub struct CallOutcome {
    pub value: RpcValue,
    pub backends_called: Vec<String>,
    pub backends_skipped: Vec<String>,
}

/// An argument after its virtual-ID routing decision has been resolved
/// once, globally — before any per-backend materialization.
enum Resolved {
    Session,
    Routed { owner: String, local_id: i64 },
    Plain(RpcValue),
}

enum Outcome {
    Skipped,
    Called(Result<RpcValue, GatewayError>),
}

impl Demultiplexer {
    pub fn new(vid: Arc<VidManager>, clients: BTreeMap<String, BackendClient>) -> Self {
        Self { vid, clients }
    }

    #[tracing::instrument(skip(self, args), fields(method = %method))]
    pub async fn call(&self, method: &str, args: &[Arg]) -> Result<CallOutcome, GatewayError> {
        let resolved = resolve_args(&self.vid, args)?;
        let contexts = self.vid.list_contexts();

        let futures = contexts.iter().map(|fqdn| self.dispatch_one(fqdn, method, &resolved));
        let outcomes = join_all(futures).await;

        let mut shards: BTreeMap<String, RpcValue> = BTreeMap::new();
        let mut backends_called = Vec::new();
        let mut backends_skipped = Vec::new();
        for (fqdn, outcome) in contexts.iter().zip(outcomes) {
            match outcome {
                Outcome::Skipped => backends_skipped.push(fqdn.clone()),
                Outcome::Called(Ok(v)) => {
                    backends_called.push(fqdn.clone());
                    shards.insert(fqdn.clone(), v);
                }
                Outcome::Called(Err(e)) => return Err(e),
            }
        }

        let value = aggregator::aggregate(&self.vid, &shards);
        Ok(CallOutcome { value, backends_called, backends_skipped })
    }

    async fn dispatch_one(&self, fqdn: &str, method: &str, resolved: &[Resolved]) -> Outcome {
        for r in resolved {
            if let Resolved::Routed { owner, .. } = r {
                if owner != fqdn {
                    return Outcome::Skipped;
                }
            }
        }

        let client = match self.clients.get(fqdn) {
            Some(c) => c,
            None => {
                return Outcome::Called(Err(GatewayError::Config(anyhow::anyhow!(
                    "no backend client registered for context `{fqdn}`"
                ))))
            }
        };

        let needs_session = resolved.iter().any(|r| matches!(r, Resolved::Session));
        let token = if needs_session {
            match client.session_token().await {
                Ok(t) => Some(t),
                Err(e) => return Outcome::Called(Err(backend_auth_error(fqdn, e))),
            }
        } else {
            None
        };

        let args = materialize(resolved, token.as_deref());
        match client.call(method, args).await {
            Ok(v) => Outcome::Called(Ok(v)),
            Err(e) if needs_session && e.is_fault() => {
                client.invalidate_session().await;
                let retry_token = match client.session_token().await {
                    Ok(t) => t,
                    Err(e2) => return Outcome::Called(Err(backend_auth_error(fqdn, e2))),
                };
                let retry_args = materialize(resolved, Some(&retry_token));
                match client.call(method, retry_args).await {
                    Ok(v) => Outcome::Called(Ok(v)),
                    Err(e2) => Outcome::Called(Err(backend_call_error(fqdn, e2))),
                }
            }
            Err(e) => Outcome::Called(Err(backend_call_error(fqdn, e))),
        }
    }
}

fn resolve_args(vid: &VidManager, args: &[Arg]) -> Result<Vec<Resolved>, GatewayError> {
    args.iter()
        .map(|a| match a {
            Arg::SessionToken => Ok(Resolved::Session),
            Arg::Value(RpcValue::Int(n)) => {
                let (local_id, owner) = vid.to_local(*n)?;
                Ok(Resolved::Routed { owner, local_id })
            }
            Arg::Value(v) => Ok(Resolved::Plain(v.clone())),
        })
        .collect()
}

fn materialize(resolved: &[Resolved], token: Option<&str>) -> Vec<RpcValue> {
    resolved
        .iter()
        .map(|r| match r {
            Resolved::Session => RpcValue::String(
                token.expect("session token resolved before materialization").to_string(),
            ),
            Resolved::Routed { local_id, .. } => RpcValue::Int(*local_id),
            Resolved::Plain(v) => v.clone(),
        })
        .collect()
}

fn backend_auth_error(fqdn: &str, e: crate::backend::BackendCallError) -> GatewayError {
    GatewayError::BackendAuth { fqdn: fqdn.to_string(), source: anyhow::anyhow!(e.to_string()) }
}

fn backend_call_error(fqdn: &str, e: crate::backend::BackendCallError) -> GatewayError {
    GatewayError::BackendCall { fqdn: fqdn.to_string(), source: anyhow::anyhow!(e.to_string()) }
}
