use super::network::{NetworkIdentitySource, UdpRouteResolver};
use super::process::{MemoryStats, ProcFs, ProcessState, ProcessStatusSource};
use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Build identifier reported as the runtime version when nothing else is configured
pub fn build_version() -> String {
    match option_env!("HEALTHCHECKER_BUILD_VERSION") {
        Some(version) if !version.is_empty() => version.to_string(),
        _ => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    }
}

/// Point-in-time process and host status attached to every health response
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub pid: u64,
    /// `None` until the first successful collection
    pub process_state: Option<ProcessState>,
    pub process_active: bool,
    pub memory: MemoryStats,
    pub ip_address: String,
    pub runtime_version: String,
    pub can_accept_work: bool,
    pub start_time: DateTime<Utc>,
}

impl SystemSnapshot {
    /// Snapshot with nothing collected yet
    pub fn empty(start_time: DateTime<Utc>) -> Self {
        Self {
            pid: 0,
            process_state: None,
            process_active: false,
            memory: MemoryStats::default(),
            ip_address: String::new(),
            runtime_version: String::new(),
            can_accept_work: false,
            start_time,
        }
    }
}

/// A process can take work when it is active and the host still has memory available
pub fn can_accept_work(process_active: bool, memory: &MemoryStats) -> bool {
    process_active && memory.available > 0
}

/// Combines the process/memory source and the network identity source into snapshots
pub struct SnapshotCollector {
    process: Box<dyn ProcessStatusSource>,
    network: Box<dyn NetworkIdentitySource>,
    runtime_version: String,
}

impl SnapshotCollector {
    pub fn new(
        process: Box<dyn ProcessStatusSource>,
        network: Box<dyn NetworkIdentitySource>,
    ) -> Self {
        Self {
            process,
            network,
            runtime_version: build_version(),
        }
    }

    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = version.into();
        self
    }

    /// Collect a fresh snapshot.
    ///
    /// Process and memory accounting are required; the outbound IP is best
    /// effort and left empty when the route cannot be resolved.
    pub fn collect(&self, start_time: DateTime<Utc>) -> Result<SystemSnapshot, SnapshotError> {
        let status = self.process.process_status()?;
        let memory = self.process.memory_stats()?;

        let ip_address = match self.network.outbound_ip() {
            Ok(ip) => ip.to_string(),
            Err(e) => {
                warn!("Could not resolve outbound IP address: {}", e);
                String::new()
            }
        };

        let process_active = status.state.is_active();

        Ok(SystemSnapshot {
            pid: status.pid,
            process_state: Some(status.state),
            process_active,
            can_accept_work: can_accept_work(process_active, &memory),
            memory,
            ip_address,
            runtime_version: self.runtime_version.clone(),
            start_time,
        })
    }
}

impl Default for SnapshotCollector {
    fn default() -> Self {
        Self::new(Box::new(ProcFs::new()), Box::new(UdpRouteResolver::default()))
    }
}

impl std::fmt::Debug for SnapshotCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCollector")
            .field("runtime_version", &self.runtime_version)
            .finish_non_exhaustive()
    }
}
