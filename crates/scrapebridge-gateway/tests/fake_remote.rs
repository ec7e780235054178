//! In-memory remote exporter behind the `Launcher` seam, shared by tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt, DuplexStream};

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::protocol::{encode_frame, HANDSHAKE_REPLY, HANDSHAKE_REQUEST, QUERY_TOKEN};
use scrapebridge_core::TargetId;
use scrapebridge_gateway::bridge::{Launcher, Link, ProcessHandle};

/// Behaviour of the remote side for one launch.
#[derive(Debug, Clone)]
pub enum Remote {
    /// The launcher itself fails.
    LaunchFails,
    /// Hang up without reading anything.
    Refuse,
    /// Read the handshake, then hang up before replying.
    CloseAfterHandshake,
    /// Answer the handshake with these bytes, then wait for the client to go.
    BadHandshake(Vec<u8>),
    /// Handshake, then answer queries with these raw replies in order and
    /// hang up after the last one.
    Replies(Vec<Vec<u8>>),
    /// Handshake, then answer every query with a frame of `payload` after
    /// `delay`.
    Serve { payload: Vec<u8>, delay: Duration },
}

impl Remote {
    pub fn frames(payloads: &[&[u8]]) -> Self {
        Remote::Replies(
            payloads
                .iter()
                .map(|p| encode_frame(p).unwrap().to_vec())
                .collect(),
        )
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    scripts: Mutex<VecDeque<Remote>>,
    launches: AtomicUsize,
    kills: Arc<AtomicUsize>,
    seen: Mutex<Vec<TargetId>>,
}

impl FakeLauncher {
    /// Launches consume `scripts` in order; once exhausted every launch is
    /// refused.
    pub fn new(scripts: impl IntoIterator<Item = Remote>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<TargetId> {
        self.seen.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, target: &TargetId) -> Result<Link> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(target.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Remote::Refuse);
        if let Remote::LaunchFails = script {
            return Err(BridgeError::LaunchFailure("no such program".into()));
        }

        let (client, remote) = duplex(64 * 1024);
        tokio::spawn(run_remote(script, remote));

        let (stdout, stdin) = split(client);
        Ok(Link::new(
            Box::new(stdin),
            Box::new(stdout),
            Box::new(FakeProcess {
                kills: Arc::clone(&self.kills),
            }),
        ))
    }
}

struct FakeProcess {
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl ProcessHandle for FakeProcess {
    fn stderr_escaped(&self) -> String {
        "fake remote\\nsecond line".into()
    }

    async fn settle(&mut self, _grace: Duration) -> String {
        "exit status: 1".into()
    }

    async fn kill(&mut self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }
}

async fn accept_handshake(io: &mut DuplexStream) -> bool {
    let mut token = [0u8; 2];
    if io.read_exact(&mut token).await.is_err() || &token != HANDSHAKE_REQUEST {
        return false;
    }
    io.write_all(HANDSHAKE_REPLY).await.is_ok()
}

async fn next_query(io: &mut DuplexStream) -> bool {
    let mut token = [0u8; 2];
    io.read_exact(&mut token).await.is_ok() && &token == QUERY_TOKEN
}

async fn run_remote(script: Remote, mut io: DuplexStream) {
    match script {
        Remote::LaunchFails | Remote::Refuse => {}
        Remote::CloseAfterHandshake => {
            let mut token = [0u8; 2];
            let _ = io.read_exact(&mut token).await;
        }
        Remote::BadHandshake(reply) => {
            let mut token = [0u8; 2];
            if io.read_exact(&mut token).await.is_ok() {
                let _ = io.write_all(&reply).await;
            }
            // Returns once the client drops its end.
            let mut rest = Vec::new();
            let _ = io.read_to_end(&mut rest).await;
        }
        Remote::Replies(replies) => {
            if !accept_handshake(&mut io).await {
                return;
            }
            for reply in replies {
                if !next_query(&mut io).await || io.write_all(&reply).await.is_err() {
                    return;
                }
            }
        }
        Remote::Serve { payload, delay } => {
            if !accept_handshake(&mut io).await {
                return;
            }
            let frame = encode_frame(&payload).unwrap();
            while next_query(&mut io).await {
                tokio::time::sleep(delay).await;
                if io.write_all(&frame).await.is_err() {
                    return;
                }
            }
        }
    }
}
