pub mod engine;
pub mod probe;
pub mod response;

pub use engine::{Healthchecker, SYSTEM_SERVICE};
pub use probe::{
    async_probe_fn, probe_fn, AsyncFnProbe, FailureInfo, FnProbe, Probe, ProbeOutcome,
    ProbeRecord, ProbeRegistry,
};
pub use response::{AggregateResponse, HealthResponseBody, SystemInformation};
