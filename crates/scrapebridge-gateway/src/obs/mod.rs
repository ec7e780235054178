//! In-process self-metrics, rendered by the `/metrics` handler in Prometheus
//! text format. These describe the bridge itself, not the exporters behind it.

pub mod metrics;

pub use metrics::BridgeMetrics;
