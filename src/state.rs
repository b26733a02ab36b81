//! Shared application state injected into every HTTP handler.
//!
//! Built once at startup and never mutated afterward — the backend context
//! set is fixed for the lifetime of the process, so there is nothing to
//! hot-swap and no need for interior mutability here.

use std::sync::Arc;
use std::time::Instant;

use crate::{config::GatewayConfig, demux::Demultiplexer, methodspec::MethodSpecRegistry, traffic::TrafficLog};

pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub registry: Arc<MethodSpecRegistry>,
    pub demux: Arc<Demultiplexer>,
    pub traffic: Arc<TrafficLog>,
    pub started_at: Instant,
}
