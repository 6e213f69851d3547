//! Health monitoring types and the probe-result state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Rolling health status of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Failed,
}

impl ServiceStatus {
    /// Only HEALTHY and DEGRADED count as available; UNKNOWN does not
    pub fn is_available(self) -> bool {
        matches!(self, ServiceStatus::Healthy | ServiceStatus::Degraded)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Unknown => write!(f, "UNKNOWN"),
            ServiceStatus::Healthy => write!(f, "HEALTHY"),
            ServiceStatus::Degraded => write!(f, "DEGRADED"),
            ServiceStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// What a single probe reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            details: None,
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            details: None,
            error: Some(error.into()),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: ServiceStatus,
    pub timestamp: DateTime<Utc>,
    pub probe_result: ProbeResult,
}

/// Hysteresis thresholds for the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub healthy_after: u32,
    pub failed_after: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            healthy_after: crate::constants::health::HEALTHY_THRESHOLD,
            failed_after: crate::constants::health::FAILED_THRESHOLD,
        }
    }
}

/// Per-service rolling health state
#[derive(Debug, Clone)]
pub struct HealthRecord {
    pub status: ServiceStatus,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_check: Option<DateTime<Utc>>,
    history: VecDeque<HistoryEntry>,
    history_limit: usize,
}

impl HealthRecord {
    pub fn new(history_limit: usize) -> Self {
        Self {
            status: ServiceStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_check: None,
            history: VecDeque::with_capacity(history_limit.min(16)),
            history_limit,
        }
    }

    /// Fold one probe result into the record and log it to history.
    /// This is the only place that moves `status` away from UNKNOWN.
    pub fn apply(&mut self, result: ProbeResult, thresholds: Thresholds, at: DateTime<Utc>) {
        if result.healthy {
            self.consecutive_failures = 0;
            self.consecutive_successes += 1;
            self.status = if self.consecutive_successes >= thresholds.healthy_after {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Degraded
            };
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures += 1;
            self.status = if self.consecutive_failures >= thresholds.failed_after {
                ServiceStatus::Failed
            } else {
                ServiceStatus::Degraded
            };
        }

        self.last_check = Some(at);
        self.push_history(HistoryEntry {
            status: self.status,
            timestamp: at,
            probe_result: result,
        });
    }

    /// Back to UNKNOWN with zeroed counters. History is kept.
    pub fn reset(&mut self) {
        self.status = ServiceStatus::Unknown;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    fn push_history(&mut self, entry: HistoryEntry) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: self.status,
            last_check: self.last_check,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            history: self.history.iter().cloned().collect(),
        }
    }
}

/// Read-only copy of a health record handed out to callers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthSnapshot {
    pub status: ServiceStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub history: Vec<HistoryEntry>,
}

impl HealthSnapshot {
    /// Snapshot for a name the monitor has never heard of
    pub fn unknown() -> Self {
        Self::default()
    }
}
