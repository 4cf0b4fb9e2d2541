use super::probe::FailureInfo;
use crate::system::{MemoryStats, SystemSnapshot};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Aggregate answer of one execution cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResponse {
    pub code: StatusCode,
    /// Only populated when `code` is the unhealthy status
    pub failures: Vec<FailureInfo>,
    pub system: SystemSnapshot,
}

/// JSON body served by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponseBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<FailureInfo>,
    pub code: u16,
    pub system_information: SystemInformation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInformation {
    pub process_status: String,
    pub process_active: bool,
    pub pid: u64,
    /// RFC 3339
    pub start_time: String,
    pub memory: MemoryStats,
    pub ip_address: String,
    pub runtime_version: String,
    pub can_accept_work: bool,
}

impl From<&SystemSnapshot> for SystemInformation {
    fn from(snapshot: &SystemSnapshot) -> Self {
        Self {
            process_status: snapshot
                .process_state
                .map(|s| s.to_string())
                .unwrap_or_default(),
            process_active: snapshot.process_active,
            pid: snapshot.pid,
            start_time: snapshot
                .start_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            memory: snapshot.memory,
            ip_address: snapshot.ip_address.clone(),
            runtime_version: snapshot.runtime_version.clone(),
            can_accept_work: snapshot.can_accept_work,
        }
    }
}

impl AggregateResponse {
    pub fn is_healthy(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn body(&self) -> HealthResponseBody {
        HealthResponseBody {
            info: self.failures.clone(),
            code: self.code.as_u16(),
            system_information: SystemInformation::from(&self.system),
        }
    }
}

impl IntoResponse for AggregateResponse {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.body()) {
            Ok(bytes) => (
                self.code,
                [(header::CONTENT_TYPE, "application/json")],
                bytes,
            )
                .into_response(),
            Err(e) => {
                error!("Failed to serialize health response: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to serialize health response",
                )
                    .into_response()
            }
        }
    }
}
