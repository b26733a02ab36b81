use std::{collections::BTreeMap, net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;

use uyuni_gateway_rs::api;
use uyuni_gateway_rs::backend::BackendClient;
use uyuni_gateway_rs::config::GatewayConfig;
use uyuni_gateway_rs::demux::Demultiplexer;
use uyuni_gateway_rs::methodspec::MethodSpecRegistry;
use uyuni_gateway_rs::state::GatewayState;
use uyuni_gateway_rs::traffic::TrafficLog;
use uyuni_gateway_rs::vid::VidManager;

/// REST-to-XML-RPC micro-gateway that fans a logical call out across
/// multiple Uyuni-family backends and unifies their object-ID namespaces.
#[derive(Parser, Debug)]
#[command(name = "uyuni-gateway", version, about)]
struct Args {
    /// Path to the XML-RPC method spec document.
    #[arg(short = 's', long = "rpcspec", default_value = "/etc/rhn/mgr-api.spec.conf")]
    rpcspec: PathBuf,

    /// Path to the gateway configuration document.
    #[arg(short = 'c', long = "config", default_value = "/etc/rhn/mgr-api.conf")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uyuni_gateway=info,tower_http=warn".into()),
        )
        .init();

    let args = Args::parse();

    let gateway_config = GatewayConfig::load(&args.config)
        .with_context(|| format!("loading gateway config from {}", args.config.display()))?;
    let registry = MethodSpecRegistry::load(&args.rpcspec)
        .with_context(|| format!("loading method spec from {}", args.rpcspec.display()))?;

    let (vid, clients) = build_backends(&gateway_config)?;

    info!(backends = vid.list_contexts().len(), "registered backend contexts");

    let demux = Demultiplexer::new(Arc::new(vid), clients);
    let traffic_log = Arc::new(TrafficLog::new(1000));

    let state = Arc::new(GatewayState {
        config: Arc::new(gateway_config.clone()),
        registry: Arc::new(registry),
        demux: Arc::new(demux),
        traffic: traffic_log,
        started_at: Instant::now(),
    });

    let addr: SocketAddr = gateway_config
        .context
        .http_address
        .parse()
        .with_context(|| format!("parsing http_address `{}`", gateway_config.context.http_address))?;

    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO));

    let app = api::router(state)
        .layer(axum::middleware::from_fn(api::request_id::request_id_middleware))
        .layer(trace_layer);

    info!(%addr, "uyuni-gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Register one backend context per configured host (in a stable,
/// alphabetical order) and build its XML-RPC client.
fn build_backends(config: &GatewayConfig) -> anyhow::Result<(VidManager, BTreeMap<String, BackendClient>)> {
    let mut vid = VidManager::new();
    let mut clients = BTreeMap::new();

    for fqdn in config.host_fqdns() {
        vid.add_context(&fqdn)?;
        let setup = config
            .host_setup(&fqdn)
            .with_context(|| format!("resolving settings for host `{fqdn}`"))?;
        let client = BackendClient::new(fqdn.clone(), &setup)
            .with_context(|| format!("building backend client for `{fqdn}`"))?;
        clients.insert(fqdn, client);
    }

    Ok((vid, clients))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
