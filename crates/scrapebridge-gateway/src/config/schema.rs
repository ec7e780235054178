use std::net::SocketAddr;

use serde::Deserialize;
use scrapebridge_core::error::{BridgeError, Result};

use crate::context::target::is_valid_vm_name;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub bridge: BridgeSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            bridge: BridgeSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BridgeError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.bridge.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Request line plus headers; larger requests get 431.
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_ms: default_request_timeout_ms(),
            max_header_bytes: default_max_header_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        let addr = self.listen_addr()?;
        if addr.port() < 1025 {
            return Err(BridgeError::BadRequest(
                "gateway.listen port cannot be outside the 1025-65535 range".into(),
            ));
        }
        if !(1000..=300_000).contains(&self.request_timeout_ms) {
            return Err(BridgeError::BadRequest(
                "gateway.request_timeout_ms must be between 1000 and 300000".into(),
            ));
        }
        if !(1024..=65_536).contains(&self.max_header_bytes) {
            return Err(BridgeError::BadRequest(
                "gateway.max_header_bytes must be between 1024 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| BridgeError::BadRequest(format!("gateway.listen must be a valid socket address: {e}")))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8199".into()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_max_header_bytes() -> usize {
    5120
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Program that opens the inter-VM channel.
    #[serde(default = "default_client_program")]
    pub client_program: String,

    /// Arguments placed before `<vm> <service[+arg]>`.
    #[serde(default)]
    pub client_args: Vec<String>,

    #[serde(default = "default_proxy_service")]
    pub proxy_service: String,

    #[serde(default = "default_discovery_service")]
    pub discovery_service: String,

    #[serde(default = "default_discovery_vm")]
    pub discovery_vm: String,

    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,

    #[serde(default = "default_stderr_capture_bytes")]
    pub stderr_capture_bytes: usize,

    #[serde(default)]
    pub retry_stale_connection: bool,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            client_program: default_client_program(),
            client_args: Vec::new(),
            proxy_service: default_proxy_service(),
            discovery_service: default_discovery_service(),
            discovery_vm: default_discovery_vm(),
            exit_grace_ms: default_exit_grace_ms(),
            stderr_capture_bytes: default_stderr_capture_bytes(),
            retry_stale_connection: false,
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bridge.client_program", &self.client_program),
            ("bridge.proxy_service", &self.proxy_service),
            ("bridge.discovery_service", &self.discovery_service),
        ] {
            if value.trim().is_empty() {
                return Err(BridgeError::BadRequest(format!("{name} must not be empty")));
            }
        }
        if !is_valid_vm_name(&self.discovery_vm) {
            return Err(BridgeError::BadRequest(
                "bridge.discovery_vm must be a valid VM name".into(),
            ));
        }
        if self.exit_grace_ms > 30_000 {
            return Err(BridgeError::BadRequest(
                "bridge.exit_grace_ms must be at most 30000".into(),
            ));
        }
        if self.stderr_capture_bytes > 1 << 20 {
            return Err(BridgeError::BadRequest(
                "bridge.stderr_capture_bytes must be at most 1048576".into(),
            ));
        }
        Ok(())
    }
}

fn default_client_program() -> String {
    "qrexec-client-vm".into()
}
fn default_proxy_service() -> String {
    "ruddo.PrometheusProxy".into()
}
fn default_discovery_service() -> String {
    "ruddo.PrometheusDiscover".into()
}
fn default_discovery_vm() -> String {
    "dom0".into()
}
fn default_exit_grace_ms() -> u64 {
    1000
}
fn default_stderr_capture_bytes() -> usize {
    8192
}
