//! Health monitoring module
//!
//! Rolling per-service health driven by periodic probes.

pub mod monitor;
pub mod types;

pub use monitor::{probe_fn, HealthMonitor, HealthProbe, MonitorConfig, ProbeFuture};
pub use types::{HealthRecord, HealthSnapshot, HistoryEntry, ProbeResult, ServiceStatus, Thresholds};
