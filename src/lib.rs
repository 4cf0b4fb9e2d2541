//! Health-check aggregation: run registered probes in order under one lock,
//! attach a process/host snapshot and serve the result over HTTP.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod system;

pub use config::HealthConfig;
pub use error::{ConfigError, SnapshotError};
pub use health::{
    async_probe_fn, probe_fn, AggregateResponse, FailureInfo, Healthchecker, Probe, ProbeOutcome,
};
