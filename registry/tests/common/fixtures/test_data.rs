//! Common test names and settings

use service_registry::RegistryConfig;
use std::time::Duration;

/// Service names used across tests
pub mod services {
    pub const CONFIG: &str = "Config";
    pub const LOGGER: &str = "Logger";
    pub const DATABASE: &str = "DatabaseClient";
    pub const DB_ALIAS: &str = "DB";
    pub const FOO: &str = "Foo";
    pub const FLAKY: &str = "Flaky";
    pub const UNKNOWN: &str = "Unknown";
}

/// Registry config with a short dependency timeout for paused-clock tests
pub fn fast_timeout_config(timeout_ms: u64) -> RegistryConfig {
    RegistryConfig {
        default_dependency_timeout: Duration::from_millis(timeout_ms),
        ..RegistryConfig::default()
    }
}
