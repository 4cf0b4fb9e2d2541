pub mod prometheus_metrics;

pub use prometheus_metrics::{
    metrics_handler, record_cycle, record_probe_failure, record_snapshot_failure,
    MetricsRegistry, METRICS_REGISTRY,
};
