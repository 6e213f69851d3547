//! Read-only status projections served to monitoring code

use crate::descriptor::{DescriptorConfig, ImplementationKind};
use crate::health::{HealthSnapshot, ServiceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusReport {
    pub name: String,
    /// A descriptor exists for this name
    pub registered: bool,
    /// A built instance is cached
    pub instantiated: bool,
    pub implementation: Option<ImplementationKind>,
    pub dependencies: Vec<String>,
    pub has_fallback: bool,
    pub health: HealthSnapshot,
    pub registered_at: Option<DateTime<Utc>>,
    pub config: Option<DescriptorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl StatusSummary {
    pub fn tally<'a>(reports: impl IntoIterator<Item = &'a ServiceStatusReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.total += 1;
            match report.health.status {
                ServiceStatus::Healthy => summary.healthy += 1,
                ServiceStatus::Degraded => summary.degraded += 1,
                ServiceStatus::Failed => summary.failed += 1,
                ServiceStatus::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllServicesStatus {
    pub services: Vec<ServiceStatusReport>,
    pub summary: StatusSummary,
    pub timestamp: DateTime<Utc>,
}
