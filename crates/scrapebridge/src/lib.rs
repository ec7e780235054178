//! Top-level facade crate for scrapebridge.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use scrapebridge_core::*;
}

pub mod gateway {
    pub use scrapebridge_gateway::*;
}
