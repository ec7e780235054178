//! Channel: one persistent channel client per target.
//!
//! State machine:
//! - `Disconnected` (initial): the next query launches the client and runs
//!   the handshake.
//! - `Connected`: queries reuse the live process and pipes.
//! - Any launch, handshake, or exchange failure tears the link down and goes
//!   back to `Disconnected`; reconnection happens lazily on the next query.
//!
//! The state lock is held for a whole query, reconnection and failure
//! reporting included, so queries to one target run strictly one after
//! another, never see a half-built link, and update the reporter in order.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::protocol::{encode_handshake, encode_query_token, HANDSHAKE_REQUEST, QUERY_TOKEN};
use scrapebridge_core::TargetId;

use super::codec;
use super::launcher::{Launcher, Link};
use super::reporter::FailureReporter;

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// How long a client that failed the handshake gets to exit before it is
    /// killed (its exit status goes into the failure log).
    pub exit_grace: Duration,
    /// Reconnect once within a query when a reused link turns out to be dead.
    pub retry_stale: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            exit_grace: Duration::from_millis(1000),
            retry_stale: false,
        }
    }
}

enum LinkState {
    Disconnected,
    Connected(Link),
}

impl LinkState {
    fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected(_))
    }

    /// Close pipes, kill and reap the process, forget the link. Idempotent.
    async fn teardown(&mut self) {
        if let LinkState::Connected(link) = std::mem::replace(self, LinkState::Disconnected) {
            link.close().await;
        }
    }
}

/// A failure plus what the reporter needs to log it.
struct Fault {
    stage: &'static str,
    error: BridgeError,
    detail: Option<String>,
    /// The remote was already gone before this exchange started.
    stale: bool,
}

impl Fault {
    fn new(stage: &'static str, error: BridgeError) -> Self {
        Self {
            stage,
            error,
            detail: None,
            stale: false,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }

    fn stale_if(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }
}

pub struct Channel {
    target: TargetId,
    launcher: Arc<dyn Launcher>,
    settings: ChannelSettings,
    state: Mutex<LinkState>,
    reporter: FailureReporter,
    connected: AtomicBool,
    launches: AtomicU64,
}

impl Channel {
    pub fn new(target: TargetId, launcher: Arc<dyn Launcher>, settings: ChannelSettings) -> Self {
        Self {
            reporter: FailureReporter::new(target.to_string()),
            target,
            launcher,
            settings,
            state: Mutex::new(LinkState::Disconnected),
            connected: AtomicBool::new(false),
            launches: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    /// Last observed state; may lag while a query is in flight.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of times a channel client was launched for this target.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    pub fn reporter(&self) -> &FailureReporter {
        &self.reporter
    }

    /// Fetch one payload from the remote exporter.
    pub async fn query(&self) -> Result<Bytes> {
        let mut state = self.state.lock().await;
        let reused = state.is_connected();

        let mut outcome = self.exchange(&mut state).await;
        let retry = matches!(&outcome, Err(fault) if reused && fault.stale && self.settings.retry_stale);
        if retry {
            tracing::debug!(channel = %self.target, "reused link was dead, reconnecting");
            outcome = self.exchange(&mut state).await;
        }
        self.connected.store(state.is_connected(), Ordering::Relaxed);

        // Report under the state lock so outcomes reach the reporter in
        // query order.
        let result = match outcome {
            Ok(payload) => {
                self.reporter.success();
                tracing::debug!(channel = %self.target, bytes = payload.len(), "payload received");
                Ok(payload)
            }
            Err(fault) => {
                self.reporter.failure(fault.stage, &fault.error, fault.detail.as_deref());
                Err(fault.error)
            }
        };
        drop(state);
        result
    }

    /// Tear down the link if one is up. Waits for any in-flight query.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.teardown().await;
        self.connected.store(false, Ordering::Relaxed);
    }

    async fn exchange(&self, state: &mut LinkState) -> std::result::Result<Bytes, Fault> {
        if !state.is_connected() {
            *state = LinkState::Connected(self.connect().await?);
        }

        let result = match state {
            LinkState::Connected(link) => query_link(link).await,
            LinkState::Disconnected => Err(Fault::new(
                "query",
                BridgeError::Internal("channel not connected".into()),
            )),
        };
        if result.is_err() {
            state.teardown().await;
        }
        result
    }

    /// Launch the client and run the handshake. Nothing survives a failure.
    async fn connect(&self) -> std::result::Result<Link, Fault> {
        self.launches.fetch_add(1, Ordering::Relaxed);
        let mut link = self
            .launcher
            .launch(&self.target)
            .map_err(|e| Fault::new("launch", e))?;

        match handshake(&mut link).await {
            Ok(()) => {
                tracing::debug!(channel = %self.target, "handshake complete");
                Ok(link)
            }
            Err(error) => {
                let status = link.process.settle(self.settings.exit_grace).await;
                let detail = format!("stderr: {}, result: {status}", link.process.stderr_escaped());
                link.close().await;
                Err(Fault::new("handshake", error).with_detail(detail))
            }
        }
    }
}

async fn handshake(link: &mut Link) -> Result<()> {
    match codec::write_token(&mut link.stdin, encode_handshake()).await {
        Ok(n) if n == HANDSHAKE_REQUEST.len() => {}
        Ok(n) => return Err(BridgeError::HandshakeFailure(format!("short write of {n} bytes"))),
        Err(e) if codec::is_closed(&e) => return Err(BridgeError::RequestRefused),
        Err(e) => return Err(BridgeError::HandshakeFailure(format!("write failed: {e}"))),
    }
    codec::read_handshake(&mut link.stdout).await
}

async fn query_link(link: &mut Link) -> std::result::Result<Bytes, Fault> {
    match codec::write_token(&mut link.stdin, encode_query_token()).await {
        Ok(n) if n == QUERY_TOKEN.len() => {}
        Ok(n) => return Err(Fault::new("query", BridgeError::ShortWrite { written: n })),
        Err(e) if codec::is_closed(&e) => {
            return Err(Fault::new("query", BridgeError::RequestRefused).stale_if(true))
        }
        Err(e) => return Err(Fault::new("query", codec::transport(e))),
    }

    let len = codec::read_length_header(&mut link.stdout).await.map_err(|e| {
        let stale = matches!(e, BridgeError::ShortRead { got: 0, .. });
        Fault::new("length", e).stale_if(stale)
    })?;

    codec::read_payload(&mut link.stdout, len)
        .await
        .map_err(|e| Fault::new("payload", e))
}
