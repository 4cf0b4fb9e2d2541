pub mod network;
pub mod process;
pub mod snapshot;

pub use network::{NetworkIdentitySource, UdpRouteResolver, DEFAULT_ROUTE_TARGET};
pub use process::{MemoryStats, ProcFs, ProcessState, ProcessStatus, ProcessStatusSource};
pub use snapshot::{build_version, can_accept_work, SnapshotCollector, SystemSnapshot};
