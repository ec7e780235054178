//! scrapebridge core: transport-agnostic protocol primitives, target identity,
//! error types, and the failure-suppression state machine.
//!
//! This crate defines the wire-level contract spoken with the remote exporter
//! over a channel client's stdin/stdout. It carries no async runtime so
//! the codec can be reused outside the gateway (tests, tooling).
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed frames
//! surface as `BridgeError` so a misbehaving remote only costs one channel.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod report;
pub mod target;

/// Shared result type.
pub use error::{BridgeError, ClientCode, Result};
pub use report::ReportState;
pub use target::TargetId;
