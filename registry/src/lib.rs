//! Named-service registry with dependency resolution, fallbacks and
//! periodic health monitoring.

pub mod constants;
pub mod descriptor;
pub mod errors;
pub mod fallback;
pub mod health;
pub mod registry;
pub mod status;

pub use descriptor::{
    service, DescriptorConfig, Implementation, ImplementationKind, ResolvedDependencies,
    ServiceConfig, ServiceInstance,
};
pub use errors::{RegistryError, RegistryResult};
pub use health::{HealthMonitor, HealthSnapshot, ProbeResult, ServiceStatus};
pub use registry::{RegistryConfig, ServiceRegistry};
pub use status::{AllServicesStatus, ServiceStatusReport, StatusSummary};
