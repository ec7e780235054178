use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::TargetId;

use crate::config::BridgeSection;

pub const MIN_PORT: u32 = 1025;
pub const MAX_PORT: u32 = 65535;
pub const MAX_VM_NAME_LEN: usize = 32;

/// Whole-string match of `[a-zA-Z0-9_-]{1,32}`.
///
/// Deliberately anchored: a name that merely contains a valid run, such as
/// `bad vm`, is rejected instead of passed to the channel client.
pub fn is_valid_vm_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_VM_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Validate `port`.
pub fn parse_port(raw: Option<&str>) -> Result<u32> {
    raw.and_then(|p| p.parse::<u32>().ok())
        .filter(|p| (MIN_PORT..=MAX_PORT).contains(p))
        .ok_or_else(|| {
            BridgeError::BadRequest(
                "port is a mandatory query string parameter and it cannot be outside the 1025-65535 range"
                    .into(),
            )
        })
}

/// Validate `target`. Only the first dot-separated label is the VM name, so
/// `work.example.org` addresses `work`.
pub fn parse_vm(raw: Option<&str>) -> Result<&str> {
    raw.map(|t| t.split('.').next().unwrap_or_default())
        .filter(|vm| is_valid_vm_name(vm))
        .ok_or_else(|| {
            BridgeError::BadRequest(
                "target is a mandatory query string parameter and it must conform to the standards of VM names"
                    .into(),
            )
        })
}

/// `/forward` parameters -> proxy service identity. Port is checked first.
pub fn forward_target(bridge: &BridgeSection, target: Option<&str>, port: Option<&str>) -> Result<TargetId> {
    let port = parse_port(port)?;
    let vm = parse_vm(target)?;
    Ok(TargetId::new(vm, bridge.proxy_service.as_str(), port.to_string()))
}

/// Identity used by `/discover`.
pub fn discovery_target(bridge: &BridgeSection) -> TargetId {
    TargetId::new(
        bridge.discovery_vm.as_str(),
        bridge.discovery_service.as_str(),
        "",
    )
}
