//! Target identity: which remote exporter endpoint a channel talks to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable `(vm, service, argument)` tuple used as the registry key.
///
/// Equality is plain string equality on all three fields; callers normalize
/// before construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId {
    vm: String,
    service: String,
    #[serde(default)]
    arg: String,
}

impl TargetId {
    pub fn new(vm: impl Into<String>, service: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            vm: vm.into(),
            service: service.into(),
            arg: arg.into(),
        }
    }

    pub fn vm(&self) -> &str {
        &self.vm
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }

    /// Argument handed to the channel client: `service` or `service+arg`.
    pub fn client_argument(&self) -> String {
        if self.arg.is_empty() {
            self.service.clone()
        } else {
            format!("{}+{}", self.service, self.arg)
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vm, self.client_argument())
    }
}
