use crate::error::ConfigError;
use crate::health::Healthchecker;
use crate::system::{ProcFs, SnapshotCollector, UdpRouteResolver, DEFAULT_ROUTE_TARGET};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Settings for the health endpoint and the snapshot collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Address the demo server listens on
    pub bind_address: String,
    pub route_path: String,
    pub status_ok: u16,
    pub status_ko: u16,
    /// Routable address used to discover the outbound IP
    pub ip_probe_target: String,
    /// Overrides the build identifier reported as `runtimeVersion`
    pub runtime_version: Option<String>,
    pub proc_root: PathBuf,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8085".to_string(),
            route_path: "/health".to_string(),
            status_ok: 200,
            status_ko: 500,
            ip_probe_target: DEFAULT_ROUTE_TARGET.to_string(),
            runtime_version: None,
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.status_ok_code()?;
        self.status_ko_code()?;

        if self.route_path.trim().is_empty() {
            return Err(ConfigError::Invalid("route_path must not be empty".to_string()));
        }

        self.ip_probe_addr()?;

        self.bind_address.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Invalid(format!(
                "bind_address '{}' is not a socket address: {}",
                self.bind_address, e
            ))
        })?;

        Ok(())
    }

    pub fn status_ok_code(&self) -> Result<StatusCode, ConfigError> {
        parse_status("status_ok", self.status_ok)
    }

    pub fn status_ko_code(&self) -> Result<StatusCode, ConfigError> {
        parse_status("status_ko", self.status_ko)
    }

    pub fn ip_probe_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.ip_probe_target.parse().map_err(|e| {
            ConfigError::Invalid(format!(
                "ip_probe_target '{}' is not a socket address: {}",
                self.ip_probe_target, e
            ))
        })
    }

    pub fn snapshot_collector(&self) -> Result<SnapshotCollector, ConfigError> {
        let collector = SnapshotCollector::new(
            Box::new(ProcFs::with_root(&self.proc_root)),
            Box::new(UdpRouteResolver::new(self.ip_probe_addr()?)),
        );

        Ok(match &self.runtime_version {
            Some(version) => collector.with_runtime_version(version.clone()),
            None => collector,
        })
    }

    /// Build an empty checker configured from these settings
    pub fn healthchecker(&self) -> Result<Healthchecker, ConfigError> {
        Ok(
            Healthchecker::new(self.status_ok_code()?, self.status_ko_code()?)
                .with_collector(self.snapshot_collector()?),
        )
    }
}

fn parse_status(field: &str, code: u16) -> Result<StatusCode, ConfigError> {
    StatusCode::from_u16(code).map_err(|_| {
        ConfigError::Invalid(format!("{} ({}) is not a valid HTTP status code", field, code))
    })
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HealthConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: HealthConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;

    info!(
        "Configuration loaded: route '{}' (ok={}, ko={})",
        config.route_path, config.status_ok, config.status_ko
    );

    Ok(config)
}

/// Load configuration from `CONFIG_PATH`, then the usual file names, then defaults
pub fn load_config_with_fallback() -> Result<HealthConfig, ConfigError> {
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        match load_config(&config_path) {
            Ok(config) => return Ok(config),
            Err(e) => warn!(
                "Failed to load config from CONFIG_PATH ({}): {}",
                config_path, e
            ),
        }
    }

    for path in ["healthchecker.yaml", "healthchecker.yml"] {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    info!("No configuration file found, using defaults");
    let config = HealthConfig::default();
    config.validate()?;
    Ok(config)
}
