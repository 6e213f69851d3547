//! Default timings and limits for the registry and its health monitor
//!
//! Central place for the numbers the registry falls back to when the caller
//! does not configure them explicitly.

use std::time::Duration;

/// Health monitoring constants
pub mod health {
    use super::Duration;

    /// Fixed interval between two probes of the same service
    pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);

    /// Shortest interval accepted; smaller values are raised to this
    pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

    /// Upper bound on a single probe before it counts as a failure
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Consecutive successful probes required to report HEALTHY
    pub const HEALTHY_THRESHOLD: u32 = 3;

    /// Consecutive failed probes required to report FAILED
    pub const FAILED_THRESHOLD: u32 = 3;

    /// Maximum number of entries kept in a service's status history
    pub const STATUS_HISTORY_LIMIT: usize = 100;
}

/// Service descriptor defaults
pub mod service {
    use super::Duration;

    /// Per-dependency resolution timeout
    pub const DEPENDENCY_TIMEOUT: Duration = Duration::from_millis(30_000);

    /// Advertised retry budget, reported in status output
    pub const RETRIES: u32 = 3;

    pub const CIRCUIT_BREAKER_ENABLED: bool = true;

    /// Pre-built instances have no construction step to guard
    pub const INSTANCE_CIRCUIT_BREAKER_ENABLED: bool = false;
}
