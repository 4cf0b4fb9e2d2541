use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Result of running a single probe: a status code and, on failure, the error text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub code: u16,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn ok(code: u16) -> Self {
        Self { code, error: None }
    }

    pub fn failed(code: u16, error: impl std::fmt::Display) -> Self {
        Self {
            code,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// A single health check.
///
/// Probes are run one at a time while the engine holds its lock, so a probe
/// is responsible for bounding its own latency.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the check once
    async fn check(&self) -> ProbeOutcome;

    /// Fallback identifier used when the probe was registered without a name
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Adapter turning a synchronous closure into a [`Probe`]
pub struct FnProbe<F> {
    f: F,
    name: Option<String>,
}

impl<F> FnProbe<F> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl<F> Probe for FnProbe<F>
where
    F: Fn() -> ProbeOutcome + Send + Sync,
{
    async fn check(&self) -> ProbeOutcome {
        (self.f)()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

pub fn probe_fn<F>(f: F) -> FnProbe<F>
where
    F: Fn() -> ProbeOutcome + Send + Sync,
{
    FnProbe { f, name: None }
}

/// Adapter turning an async closure into a [`Probe`]
pub struct AsyncFnProbe<F> {
    f: F,
    name: Option<String>,
}

impl<F> AsyncFnProbe<F> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl<F, Fut> Probe for AsyncFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeOutcome> + Send,
{
    async fn check(&self) -> ProbeOutcome {
        (self.f)().await
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

pub fn async_probe_fn<F, Fut>(f: F) -> AsyncFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeOutcome> + Send,
{
    AsyncFnProbe { f, name: None }
}

/// A failure recorded for one probe during the last execution cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub message: String,
    pub code: u16,
    pub service: String,
}

/// A registered probe together with its last failure, if any
pub struct ProbeRecord {
    probe: Box<dyn Probe>,
    name: Option<String>,
    last_failure: Option<FailureInfo>,
}

impl ProbeRecord {
    fn new(probe: Box<dyn Probe>, name: Option<String>) -> Self {
        Self {
            probe,
            name,
            last_failure: None,
        }
    }

    /// Registered name, falling back to the probe's own identifier, then to ""
    pub fn service_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.probe.name())
            .unwrap_or("")
    }

    pub fn last_failure(&self) -> Option<&FailureInfo> {
        self.last_failure.as_ref()
    }

    /// Run the probe once and record its failure. Returns true when it failed.
    pub(crate) async fn run(&mut self) -> bool {
        self.last_failure = None;

        let outcome = self.probe.check().await;
        match outcome.error {
            Some(message) => {
                self.last_failure = Some(FailureInfo {
                    message,
                    code: outcome.code,
                    service: self.service_name().to_string(),
                });
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ProbeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRecord")
            .field("service", &self.service_name())
            .field("last_failure", &self.last_failure)
            .finish()
    }
}

/// Ordered, append-only collection of probes. Registration order is
/// execution order and report order.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    records: Vec<ProbeRecord>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe. The same probe may be added more than once; each
    /// registration gets its own record.
    pub fn add(&mut self, probe: Box<dyn Probe>, name: Option<&str>) {
        self.records
            .push(ProbeRecord::new(probe, name.map(str::to_string)));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProbeRecord> {
        self.records.iter_mut()
    }

    /// Failures from the last cycle, in registration order
    pub fn failures(&self) -> Vec<FailureInfo> {
        self.records
            .iter()
            .filter_map(|r| r.last_failure().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_outcome() {
        assert!(!ProbeOutcome::ok(200).is_failure());

        let failed = ProbeOutcome::failed(503, "connection refused");
        assert!(failed.is_failure());
        assert_eq!(failed.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_registry_keeps_order_and_duplicates() {
        let mut registry = ProbeRegistry::new();
        assert!(registry.is_empty());

        registry.add(Box::new(probe_fn(|| ProbeOutcome::ok(200))), Some("health1"));
        registry.add(Box::new(probe_fn(|| ProbeOutcome::ok(200))), Some("health2"));
        registry.add(Box::new(probe_fn(|| ProbeOutcome::ok(200))), Some("health1"));

        let names: Vec<_> = registry.iter().map(|r| r.service_name()).collect();
        assert_eq!(names, vec!["health1", "health2", "health1"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_service_name_fallbacks() {
        let mut registry = ProbeRegistry::new();
        registry.add(
            Box::new(probe_fn(|| ProbeOutcome::ok(200)).named("fallback")),
            Some("explicit"),
        );
        registry.add(Box::new(probe_fn(|| ProbeOutcome::ok(200)).named("fallback")), None);
        registry.add(Box::new(probe_fn(|| ProbeOutcome::ok(200))), None);

        let names: Vec<_> = registry.iter().map(|r| r.service_name()).collect();
        assert_eq!(names, vec!["explicit", "fallback", ""]);
    }

    #[tokio::test]
    async fn test_record_run_sets_and_clears_failure() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let failing = Arc::new(AtomicBool::new(true));
        let flag = failing.clone();

        let mut registry = ProbeRegistry::new();
        registry.add(
            Box::new(probe_fn(move || {
                if flag.load(Ordering::SeqCst) {
                    ProbeOutcome::failed(500, "boom")
                } else {
                    ProbeOutcome::ok(200)
                }
            })),
            Some("flaky"),
        );

        let record = registry.iter_mut().next().unwrap();
        assert!(record.run().await);
        assert_eq!(
            record.last_failure(),
            Some(&FailureInfo {
                message: "boom".to_string(),
                code: 500,
                service: "flaky".to_string(),
            })
        );

        failing.store(false, Ordering::SeqCst);
        assert!(!record.run().await);
        assert!(record.last_failure().is_none());
        assert!(registry.failures().is_empty());
    }

    #[tokio::test]
    async fn test_async_probe_fn() {
        let probe = async_probe_fn(|| async { ProbeOutcome::failed(502, "upstream") })
            .named("upstream");

        let outcome = probe.check().await;
        assert_eq!(outcome.code, 502);
        assert_eq!(probe.name(), Some("upstream"));
    }
}
