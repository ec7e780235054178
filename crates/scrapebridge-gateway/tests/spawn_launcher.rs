//! The real subprocess launcher, driven through `/bin/sh` scripts.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scrapebridge_core::error::BridgeError;
use scrapebridge_core::TargetId;
use scrapebridge_gateway::bridge::launcher::escape_newlines;
use scrapebridge_gateway::bridge::{ChannelSettings, Launcher, Multiplexer, SpawnLauncher};

const ECHO_REMOTE: &str = r#"
msg="$1 $2"
IFS= read -r hello || exit 1
[ "$hello" = "+" ] || exit 2
printf '=\n'
while IFS= read -r q; do
  printf '%s\n%s' "${#msg}" "$msg"
done
"#;

const REFUSING_REMOTE: &str = r#"
echo "request refused" >&2
echo "policy denied" >&2
exit 1
"#;

fn script(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scrapebridge-{}-{name}.sh", std::process::id()));
    std::fs::write(&path, body).unwrap();
    path
}

fn sh_launcher(path: &Path) -> SpawnLauncher {
    SpawnLauncher::new("/bin/sh", vec![path.display().to_string()], 8192)
}

#[tokio::test]
async fn echo_remote_sees_vm_and_service_argument() {
    let path = script("echo", ECHO_REMOTE);
    let mux = Multiplexer::new(Arc::new(sh_launcher(&path)), ChannelSettings::default());
    let target = TargetId::new("validvm1", "ruddo.PrometheusProxy", "9100");

    let first = mux.query(&target).await.unwrap();
    assert_eq!(&first[..], b"validvm1 ruddo.PrometheusProxy+9100");
    let second = mux.query(&target).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mux.launches(), 1);

    let discovery = TargetId::new("dom0", "ruddo.PrometheusDiscover", "");
    assert_eq!(&mux.query(&discovery).await.unwrap()[..], b"dom0 ruddo.PrometheusDiscover");

    mux.shutdown().await;
    assert_eq!(mux.connected(), 0);
}

#[tokio::test]
async fn refusing_remote_is_request_refused() {
    let path = script("refuse", REFUSING_REMOTE);
    let mux = Multiplexer::new(Arc::new(sh_launcher(&path)), ChannelSettings::default());
    let target = TargetId::new("validvm1", "ruddo.PrometheusProxy", "9100");

    assert_eq!(mux.query(&target).await, Err(BridgeError::RequestRefused));
    assert_eq!(mux.connected(), 0);
}

#[tokio::test]
async fn refused_client_exit_status_and_stderr_are_captured() {
    let path = script("refuse-detail", REFUSING_REMOTE);
    let launcher = sh_launcher(&path);
    let mut link = launcher
        .launch(&TargetId::new("validvm1", "ruddo.PrometheusProxy", "9100"))
        .unwrap();

    let status = link.process.settle(Duration::from_secs(5)).await;
    assert!(status.contains('1'), "status={status}");

    assert_eq!(link.process.stderr_escaped(), "request refused\\npolicy denied");
    link.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stderr_is_complete_as_soon_as_settle_returns() {
    let path = script("settle-stderr", "echo 'request refused' >&2\nexit 1\n");
    let launcher = sh_launcher(&path);

    for _ in 0..50 {
        let mut link = launcher
            .launch(&TargetId::new("validvm1", "ruddo.PrometheusProxy", "9100"))
            .unwrap();
        link.process.settle(Duration::from_secs(5)).await;
        assert_eq!(link.process.stderr_escaped(), "request refused");
        link.close().await;
    }
}

#[tokio::test]
async fn stderr_capture_is_bounded() {
    let path = script("noisy", "printf 'abcdefghijklmnop' >&2\nexit 1\n");
    let launcher = SpawnLauncher::new("/bin/sh", vec![path.display().to_string()], 4);
    let mut link = launcher
        .launch(&TargetId::new("vm", "svc", ""))
        .unwrap();

    link.process.settle(Duration::from_secs(5)).await;
    assert_eq!(link.process.stderr_escaped(), "abcd");
    link.close().await;
}

#[tokio::test]
async fn missing_program_is_launch_failure() {
    let launcher = SpawnLauncher::new("/nonexistent/scrapebridge-client", Vec::new(), 8192);
    let err = launcher.launch(&TargetId::new("vm", "svc", "")).err().unwrap();
    assert_eq!(err.kind(), "LAUNCH_FAILURE");
}

#[test]
fn newline_escaping() {
    assert_eq!(escape_newlines("one\ntwo\n"), "one\\ntwo");
    assert_eq!(escape_newlines("single"), "single");
    assert_eq!(escape_newlines(""), "");
}
