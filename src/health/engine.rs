use super::probe::{FailureInfo, Probe, ProbeRegistry};
use super::response::AggregateResponse;
use crate::metrics;
use crate::system::{SnapshotCollector, SystemSnapshot};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Service name reported when the system snapshot cannot be collected
pub const SYSTEM_SERVICE: &str = "system";

struct EngineState {
    registry: ProbeRegistry,
    error_count: u32,
    snapshot: SystemSnapshot,
    snapshot_failure: Option<FailureInfo>,
}

/// Aggregates registered probes and a system snapshot into one health answer.
///
/// Register every probe with [`Healthchecker::add`] before sharing the
/// checker (usually behind an `Arc`). All execution cycles are serialized on
/// a single lock: a slow probe delays every concurrent query.
pub struct Healthchecker {
    status_ok: StatusCode,
    status_ko: StatusCode,
    start_time: DateTime<Utc>,
    collector: SnapshotCollector,
    state: Mutex<EngineState>,
}

impl Healthchecker {
    /// Create a checker answering `status_ok` when every probe passes and
    /// `status_ko` otherwise
    pub fn new(status_ok: StatusCode, status_ko: StatusCode) -> Self {
        let start_time = Utc::now();

        Self {
            status_ok,
            status_ko,
            start_time,
            collector: SnapshotCollector::default(),
            state: Mutex::new(EngineState {
                registry: ProbeRegistry::new(),
                error_count: 0,
                snapshot: SystemSnapshot::empty(start_time),
                snapshot_failure: None,
            }),
        }
    }

    /// Replace the snapshot collector (custom procfs root, route target, test sources)
    pub fn with_collector(mut self, collector: SnapshotCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Append a probe. `name` is reported as the failing service; without
    /// it the probe's own identifier is used, or an empty string.
    pub fn add(&mut self, probe: impl Probe + 'static, name: Option<&str>) {
        self.state.get_mut().registry.add(Box::new(probe), name);
    }

    pub fn status_ok(&self) -> StatusCode {
        self.status_ok
    }

    pub fn status_ko(&self) -> StatusCode {
        self.status_ko
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub async fn probe_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Run every probe once in registration order, then refresh the snapshot.
    pub async fn execute(&self) {
        let mut state = self.state.lock().await;
        self.run_cycle(&mut state).await;
    }

    /// Build the response for the last cycle and reset the failure count.
    ///
    /// This is a consuming read: a second call without an intervening
    /// [`execute`](Self::execute) reports success.
    pub async fn take_response(&self) -> AggregateResponse {
        let mut state = self.state.lock().await;
        self.build_response(&mut state)
    }

    /// Execute a cycle and take its response under one lock acquisition, so
    /// concurrent callers each get the result of their own cycle.
    pub async fn check(&self) -> AggregateResponse {
        let mut state = self.state.lock().await;
        self.run_cycle(&mut state).await;
        self.build_response(&mut state)
    }

    async fn run_cycle(&self, state: &mut EngineState) {
        let started = Instant::now();
        debug!(
            "Running health check cycle over {} probe(s)",
            state.registry.len()
        );

        state.error_count = 0;

        for record in state.registry.iter_mut() {
            if record.run().await {
                state.error_count += 1;

                if let Some(failure) = record.last_failure() {
                    warn!(
                        service = %failure.service,
                        code = failure.code,
                        "Health probe failed: {}",
                        failure.message
                    );
                    metrics::record_probe_failure(&failure.service);
                }
            }
        }

        match self.collector.collect(self.start_time) {
            Ok(snapshot) => {
                state.snapshot = snapshot;
                state.snapshot_failure = None;
            }
            Err(e) => {
                error!("System snapshot collection failed: {}", e);
                metrics::record_snapshot_failure();
                state.error_count += 1;
                state.snapshot_failure = Some(FailureInfo {
                    message: e.to_string(),
                    code: self.status_ko.as_u16(),
                    service: SYSTEM_SERVICE.to_string(),
                });
            }
        }

        metrics::record_cycle(started.elapsed(), state.error_count);
    }

    fn build_response(&self, state: &mut EngineState) -> AggregateResponse {
        let response = if state.error_count == 0 {
            AggregateResponse {
                code: self.status_ok,
                failures: Vec::new(),
                system: state.snapshot.clone(),
            }
        } else {
            let mut failures = state.registry.failures();
            failures.extend(state.snapshot_failure.clone());

            AggregateResponse {
                code: self.status_ko,
                failures,
                system: state.snapshot.clone(),
            }
        };

        state.error_count = 0;
        response
    }
}

impl std::fmt::Debug for Healthchecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Healthchecker")
            .field("status_ok", &self.status_ok)
            .field("status_ko", &self.status_ko)
            .field("start_time", &self.start_time)
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}
