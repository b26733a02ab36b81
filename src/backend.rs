//! Backend RPC client: one XML-RPC connection per configured Uyuni-family
//! backend, with lazy connection setup and an idempotent session-token state
//! machine.
//!
//! The wire transport is the real `dxr`/`dxr-client` crates layered over a
//! `reqwest::Client`: one client built once per backend, TLS behavior driven
//! by config, timeout applied at the transport layer.

use std::collections::HashMap;
use std::time::Duration;

use dxr::{TryFromValue, TryToValue, Value as DxrValue};
use dxr_client::{Call, Client, ClientError};
use reqwest::Url;
use tokio::sync::{Mutex, OnceCell};

use crate::{config::HostSetup, value::RpcValue};

/// A call-level failure, distinguishing an XML-RPC fault (which may signal
/// an expired session, worth a single retry) from a transport-level error.
#[derive(Debug, thiserror::Error)]
pub enum BackendCallError {
    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i32, message: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl BackendCallError {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}

impl From<ClientError> for BackendCallError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Fault { fault } => BackendCallError::Fault {
                code: fault.code(),
                message: fault.string().to_string(),
            },
            other => BackendCallError::Transport(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// One XML-RPC client for one backend FQDN, with lazily-established
/// connection and a coalesced session token.
pub struct BackendClient {
    fqdn: String,
    base_url: Url,
    user: String,
    password: String,
    http: reqwest::Client,
    conn: OnceCell<Client>,
    session: Mutex<Option<String>>,
}

impl BackendClient {
    pub fn new(fqdn: String, setup: &HostSetup) -> anyhow::Result<Self> {
        let scheme = if setup.tls { "https" } else { "http" };
        let base_url = Url::parse(&format!("{scheme}://{fqdn}:{port}/rpc/api", port = setup.port))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(setup.timeout_ms))
            .danger_accept_invalid_certs(setup.skip_cert_check)
            .build()?;

        Ok(Self {
            fqdn,
            base_url,
            user: setup.user.clone(),
            password: setup.password.clone(),
            http,
            conn: OnceCell::new(),
            session: Mutex::new(None),
        })
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    async fn connection(&self) -> anyhow::Result<&Client> {
        self.conn
            .get_or_try_init(|| async {
                Ok::<_, anyhow::Error>(Client::with_client(self.base_url.clone(), self.http.clone()))
            })
            .await
    }

    /// Issue one XML-RPC call, untouched by session-token or routing logic —
    /// that belongs to the demultiplexer.
    pub async fn call(&self, method: &str, args: Vec<RpcValue>) -> Result<RpcValue, BackendCallError> {
        let conn = self.connection().await?;
        let dxr_args: Vec<DxrValue> = args.iter().map(rpc_to_dxr).collect();
        let call: Call<'_, Vec<DxrValue>, DxrValue> = Call::new(method, dxr_args);
        let result = conn.call(call).await?;
        Ok(dxr_to_rpc(&result))
    }

    /// Return the current session token, authenticating if none is cached.
    /// Concurrent callers block on the same mutex and observe the token the
    /// first caller through sets — at most one `auth.login` is ever
    /// in flight at a time for this backend.
    pub async fn session_token(&self) -> Result<String, BackendCallError> {
        let mut guard = self.session.lock().await;
        if let Some(tok) = guard.as_ref() {
            return Ok(tok.clone());
        }
        let tok = self.authenticate().await?;
        *guard = Some(tok.clone());
        Ok(tok)
    }

    /// Drop the cached session token, forcing the next `session_token` call
    /// to reauthenticate.
    pub async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn authenticate(&self) -> Result<String, BackendCallError> {
        let args = vec![RpcValue::String(self.user.clone()), RpcValue::String(self.password.clone())];
        match self.call("auth.login", args).await? {
            RpcValue::String(token) => Ok(token),
            _ => Err(BackendCallError::Transport(anyhow::anyhow!(
                "auth.login against `{}` did not return a session token string",
                self.fqdn
            ))),
        }
    }
}

fn rpc_to_dxr(v: &RpcValue) -> DxrValue {
    match v {
        RpcValue::Null => DxrValue::nil(),
        RpcValue::Bool(b) => b.try_to_value().unwrap_or_else(|_| DxrValue::nil()),
        RpcValue::Int(i) => (*i as i32).try_to_value().unwrap_or_else(|_| DxrValue::nil()),
        // `DateTime` is carried as a plain wire string — see translator::coerce.
        RpcValue::String(s) | RpcValue::DateTime(s) => {
            s.clone().try_to_value().unwrap_or_else(|_| DxrValue::nil())
        }
        RpcValue::List(items) => {
            let values: Vec<DxrValue> = items.iter().map(rpc_to_dxr).collect();
            values.try_to_value().unwrap_or_else(|_| DxrValue::nil())
        }
        RpcValue::Map(map) => {
            let values: HashMap<String, DxrValue> =
                map.iter().map(|(k, v)| (k.clone(), rpc_to_dxr(v))).collect();
            values.try_to_value().unwrap_or_else(|_| DxrValue::nil())
        }
    }
}

/// Decode an opaque `dxr::Value` into our dynamic representation without
/// knowing its shape ahead of time, trying each candidate wire type in turn.
fn dxr_to_rpc(v: &DxrValue) -> RpcValue {
    if let Ok(b) = bool::try_from_value(v) {
        return RpcValue::Bool(b);
    }
    if let Ok(i) = i32::try_from_value(v) {
        return RpcValue::Int(i as i64);
    }
    if let Ok(s) = String::try_from_value(v) {
        return RpcValue::String(s);
    }
    if let Ok(items) = Vec::<DxrValue>::try_from_value(v) {
        return RpcValue::List(items.iter().map(dxr_to_rpc).collect());
    }
    if let Ok(map) = HashMap::<String, DxrValue>::try_from_value(v) {
        return RpcValue::Map(map.into_iter().map(|(k, v)| (k, dxr_to_rpc(&v))).collect());
    }
    RpcValue::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trips_through_dxr() {
        let v = RpcValue::String("hello".into());
        let dxr = rpc_to_dxr(&v);
        assert_eq!(dxr_to_rpc(&dxr), v);
    }

    #[test]
    fn int_round_trips_through_dxr() {
        let v = RpcValue::Int(42);
        let dxr = rpc_to_dxr(&v);
        assert_eq!(dxr_to_rpc(&dxr), v);
    }

    #[test]
    fn list_round_trips_through_dxr() {
        let v = RpcValue::List(vec![RpcValue::Int(1), RpcValue::String("a".into())]);
        let dxr = rpc_to_dxr(&v);
        assert_eq!(dxr_to_rpc(&dxr), v);
    }
}
