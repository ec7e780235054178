//! scrapebridge gateway library entry.
//!
//! Wires the connection multiplexer, HTTP handlers, config, and self-metrics
//! into a gateway that relays Prometheus scrapes to exporters inside isolated
//! VMs. Consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod bridge;
pub mod config;
pub mod context;
pub mod obs;
pub mod ops;
pub mod router;
