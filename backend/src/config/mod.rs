// File: backend/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use service_registry::RegistryConfig;
use std::time::Duration;
pub use manager::ConfigManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    #[serde(default)]
    pub registry: RegistrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    #[serde(default = "default_status_history_limit")]
    pub status_history_limit: usize,
    #[serde(default = "default_threshold")]
    pub healthy_threshold: u32,
    #[serde(default = "default_threshold")]
    pub failed_threshold: u32,
    #[serde(default = "default_dependency_timeout")]
    pub dependency_timeout_ms: u64,
    // Repositories wait less for the database than the registry default
    #[serde(default = "default_repository_timeout")]
    pub repository_timeout_ms: u64,
}

fn default_health_check_interval() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_status_history_limit() -> usize {
    100
}

fn default_threshold() -> u32 {
    3
}

fn default_dependency_timeout() -> u64 {
    30_000
}

fn default_repository_timeout() -> u64 {
    10_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            health_check_interval_seconds: default_health_check_interval(),
            probe_timeout_seconds: default_probe_timeout(),
            status_history_limit: default_status_history_limit(),
            healthy_threshold: default_threshold(),
            failed_threshold: default_threshold(),
            dependency_timeout_ms: default_dependency_timeout(),
            repository_timeout_ms: default_repository_timeout(),
        }
    }
}

impl RegistrySettings {
    pub fn to_registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            health_check_interval: Duration::from_secs(self.health_check_interval_seconds),
            probe_timeout: Duration::from_secs(self.probe_timeout_seconds),
            status_history_limit: self.status_history_limit,
            healthy_threshold: self.healthy_threshold,
            failed_threshold: self.failed_threshold,
            default_dependency_timeout: Duration::from_millis(self.dependency_timeout_ms),
        }
    }

    pub fn repository_timeout(&self) -> Duration {
        Duration::from_millis(self.repository_timeout_ms)
    }
}
