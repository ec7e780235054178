//! Shared application state for the scrapebridge gateway.
//!
//! Owns the channel multiplexer (constructed once, shared by every handler)
//! and the self-metrics registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use bytes::Bytes;

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::TargetId;

use crate::bridge::{ChannelSettings, Launcher, Multiplexer, SpawnLauncher};
use crate::config::GatewayConfig;
use crate::obs::BridgeMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    mux: Arc<Multiplexer>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    metrics: BridgeMetrics,
}

impl AppState {
    /// Build application state around the configured channel client.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;
        let launcher = SpawnLauncher::new(
            cfg.bridge.client_program.clone(),
            cfg.bridge.client_args.clone(),
            cfg.bridge.stderr_capture_bytes,
        );
        Ok(Self::with_launcher(cfg, Arc::new(launcher)))
    }

    /// Build application state around any launcher.
    pub fn with_launcher(cfg: GatewayConfig, launcher: Arc<dyn Launcher>) -> Self {
        let settings = ChannelSettings {
            exit_grace: Duration::from_millis(cfg.bridge.exit_grace_ms),
            retry_stale: cfg.bridge.retry_stale_connection,
        };
        Self {
            mux: Arc::new(Multiplexer::new(launcher, settings)),
            inner: Arc::new(AppStateInner {
                cfg,
                metrics: BridgeMetrics::default(),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.inner.metrics
    }

    pub fn multiplexer(&self) -> Arc<Multiplexer> {
        Arc::clone(&self.mux)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.cfg.gateway.request_timeout_ms)
    }

    /// Query `target` under the request deadline.
    ///
    /// The query runs in its own task: if the deadline passes, the caller gets
    /// `Timeout` while the channel finishes (or fails) and settles its state.
    pub async fn query(&self, target: TargetId) -> Result<Bytes> {
        let state = self.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let res = state.mux.query(&target).await;
            let outcome = match &res {
                Ok(_) => "OK",
                Err(e) => e.kind(),
            };
            let m = state.metrics();
            m.queries.inc(&[("service", target.service()), ("outcome", outcome)]);
            m.query_duration.observe(&[("service", target.service())], started.elapsed());
            res
        });

        let timeout_ms = self.inner.cfg.gateway.request_timeout_ms;
        match tokio::time::timeout(self.request_timeout(), task).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => Err(BridgeError::Internal(format!("query task failed: {e}"))),
            Err(_) => Err(BridgeError::Timeout(timeout_ms)),
        }
    }

    pub fn record_request(&self, route: &str, status: StatusCode) {
        self.metrics()
            .http_requests
            .inc(&[("route", route), ("status", status.as_str())]);
    }
}
