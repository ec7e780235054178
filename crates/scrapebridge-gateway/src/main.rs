//! scrapebridge gateway
//!
//! Relays Prometheus scrapes to exporters inside isolated VMs:
//! - `/forward?target=<vm>&port=<port>` over a persistent channel client per
//!   target
//! - `/discover` relays the listing from the discovery service
//!
//! Usage: `scrapebridge-gateway [config.yaml]` (defaults when omitted).

use tracing_subscriber::{fmt, EnvFilter};

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "scrapebridge-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => config::load_from_file(&path)?,
        None => {
            let cfg = config::GatewayConfig::default();
            cfg.validate()?;
            cfg
        }
    };
    let listen = cfg.gateway.listen_addr()?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "scrapebridge-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| BridgeError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|e| BridgeError::Internal(format!("server failed: {e}")))?;

    state.multiplexer().shutdown().await;
    tracing::info!("scrapebridge-gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.metrics().set_draining();
    tracing::info!("shutdown requested, draining");
}
