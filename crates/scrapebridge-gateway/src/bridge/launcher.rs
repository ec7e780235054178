//! Channel client launcher.
//!
//! A [`Launcher`] turns a [`TargetId`] into a live [`Link`]: the subprocess
//! that grants the inter-VM channel plus its stdin/stdout. The production
//! implementation spawns `<program> [args..] <vm> <service[+arg]>`; tests plug
//! in in-memory remotes.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::TargetId;

pub type LinkWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type LinkReader = Box<dyn AsyncRead + Send + Unpin>;

/// Handle on the process behind a link.
#[async_trait]
pub trait ProcessHandle: Send {
    /// Captured stderr so far, newlines escaped as `\n`.
    fn stderr_escaped(&self) -> String;

    /// Wait up to `grace` for the process to exit on its own and for its
    /// stderr to be fully captured, then describe the exit.
    async fn settle(&mut self, grace: Duration) -> String;

    /// Forcibly stop the process and reap it. Safe to call after exit.
    async fn kill(&mut self);
}

/// One established subprocess with both protocol pipes.
pub struct Link {
    pub stdin: LinkWriter,
    pub stdout: LinkReader,
    pub process: Box<dyn ProcessHandle>,
}

impl Link {
    pub fn new(stdin: LinkWriter, stdout: LinkReader, process: Box<dyn ProcessHandle>) -> Self {
        Self {
            stdin,
            stdout,
            process,
        }
    }

    /// Close both pipes, then stop and reap the process.
    pub async fn close(self) {
        let Link {
            stdin,
            stdout,
            mut process,
        } = self;
        drop(stdin);
        drop(stdout);
        process.kill().await;
    }
}

pub trait Launcher: Send + Sync {
    fn launch(&self, target: &TargetId) -> Result<Link>;
}

/// Spawns the configured channel client program.
#[derive(Debug, Clone)]
pub struct SpawnLauncher {
    program: String,
    args: Vec<String>,
    stderr_capture_bytes: usize,
}

impl SpawnLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>, stderr_capture_bytes: usize) -> Self {
        Self {
            program: program.into(),
            args,
            stderr_capture_bytes,
        }
    }
}

impl Launcher for SpawnLauncher {
    fn launch(&self, target: &TargetId) -> Result<Link> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(target.vm())
            .arg(target.client_argument())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| BridgeError::LaunchFailure(format!("failed to start {}: {e}", self.program)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.start_kill();
            return Err(BridgeError::LaunchFailure("failed to capture stdin/stdout pipes".into()));
        };

        let stderr = Arc::new(Mutex::new(Vec::new()));
        let capture = child.stderr.take().map(|pipe| {
            tokio::spawn(capture_stderr(pipe, Arc::clone(&stderr), self.stderr_capture_bytes))
        });

        tracing::debug!(channel = %target, pid = ?child.id(), "channel client spawned");

        Ok(Link::new(
            Box::new(stdin),
            Box::new(stdout),
            Box::new(SpawnedProcess {
                child,
                stderr,
                capture,
            }),
        ))
    }
}

struct SpawnedProcess {
    child: Child,
    stderr: Arc<Mutex<Vec<u8>>>,
    /// Drains the stderr pipe; finishes once every writer has closed it.
    capture: Option<JoinHandle<()>>,
}

#[async_trait]
impl ProcessHandle for SpawnedProcess {
    fn stderr_escaped(&self) -> String {
        match self.stderr.lock() {
            Ok(buf) => escape_newlines(&String::from_utf8_lossy(&buf)),
            Err(_) => String::new(),
        }
    }

    async fn settle(&mut self, grace: Duration) -> String {
        let deadline = Instant::now() + grace;
        let status = match timeout_at(deadline, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => format!("wait failed: {e}"),
            Err(_) => "still running".to_string(),
        };

        // Stderr is complete only once the capture task hit end of stream.
        if let Some(capture) = self.capture.as_mut() {
            if timeout_at(deadline, capture).await.is_ok() {
                self.capture = None;
            }
        }
        status
    }

    async fn kill(&mut self) {
        // `kill` also reaps; an already-exited child only reports an error.
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "channel client kill");
        }
    }
}

/// Keep up to `cap` bytes of stderr; drain the rest so the child never blocks.
async fn capture_stderr(mut pipe: ChildStderr, sink: Arc<Mutex<Vec<u8>>>, cap: usize) {
    let mut chunk = [0u8; 1024];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                if let Ok(mut buf) = sink.lock() {
                    let room = cap.saturating_sub(buf.len());
                    buf.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
    }
}

/// Trailing newline dropped, inner newlines rendered as a literal `\n`.
pub fn escape_newlines(s: &str) -> String {
    s.strip_suffix('\n').unwrap_or(s).replace('\n', "\\n")
}
