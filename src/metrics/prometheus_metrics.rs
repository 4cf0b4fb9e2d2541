use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}

pub struct MetricsRegistry {
    pub registry: Registry,

    // Execution cycles
    pub cycles_total: IntCounter,
    pub cycle_duration_seconds: Histogram,
    pub last_cycle_failures: IntGauge,

    // Failures
    pub probe_failures_total: IntCounterVec,
    pub snapshot_failures_total: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let cycles_total = IntCounter::with_opts(Opts::new(
            "health_cycles_total",
            "Total number of health check execution cycles",
        ))
        .expect("valid metric definition");

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "health_cycle_duration_seconds",
                "Duration of a full health check cycle in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )
        .expect("valid metric definition");

        let last_cycle_failures = IntGauge::with_opts(Opts::new(
            "health_last_cycle_failures",
            "Number of failures recorded by the most recent cycle",
        ))
        .expect("valid metric definition");

        let probe_failures_total = IntCounterVec::new(
            Opts::new(
                "health_probe_failures_total",
                "Total number of failed probe invocations",
            ),
            &["service"],
        )
        .expect("valid metric definition");

        let snapshot_failures_total = IntCounter::with_opts(Opts::new(
            "health_snapshot_failures_total",
            "Total number of failed system snapshot collections",
        ))
        .expect("valid metric definition");

        registry
            .register(Box::new(cycles_total.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(cycle_duration_seconds.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(last_cycle_failures.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(probe_failures_total.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(snapshot_failures_total.clone()))
            .expect("metric registered once");

        Self {
            registry,
            cycles_total,
            cycle_duration_seconds,
            last_cycle_failures,
            probe_failures_total,
            snapshot_failures_total,
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn record_cycle(duration: Duration, failures: u32) {
    METRICS_REGISTRY.cycles_total.inc();
    METRICS_REGISTRY
        .cycle_duration_seconds
        .observe(duration.as_secs_f64());
    METRICS_REGISTRY.last_cycle_failures.set(i64::from(failures));
}

pub fn record_probe_failure(service: &str) {
    METRICS_REGISTRY
        .probe_failures_total
        .with_label_values(&[service])
        .inc();
}

pub fn record_snapshot_failure() {
    METRICS_REGISTRY.snapshot_failures_total.inc();
}

/// Metrics handler for Prometheus
pub async fn metrics_handler() -> impl IntoResponse {
    match METRICS_REGISTRY.render() {
        Ok(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            Body::from(metrics),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        )
            .into_response(),
    }
}
