//! Service blueprints: how a service is built, what it needs, and how it is
//! configured.
//!
//! The construction strategy is chosen explicitly by whoever registers the
//! service:
//!
//! - [`Implementation::Factory`]: async function receiving the resolved
//!   dependencies
//! - [`Implementation::Constructor`]: synchronous function receiving the
//!   resolved dependencies
//! - [`Implementation::Instance`]: an already built value used as-is
//!
//! ```ignore
//! registry
//!     .register(
//!         "ProductRepository",
//!         Implementation::factory(create_product_repository),
//!         ServiceConfig::new()
//!             .depends_on("DatabaseClient")
//!             .with_fallback(|| Ok(service(StubProductRepository::new()))),
//!     )
//!     .await;
//! ```

use crate::constants;
use crate::health::ProbeResult;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// A live service value as handed out by the registry
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

pub type FactoryFn =
    Arc<dyn Fn(ResolvedDependencies) -> BoxFuture<'static, anyhow::Result<ServiceInstance>> + Send + Sync>;

pub type ConstructorFn =
    Arc<dyn Fn(&ResolvedDependencies) -> anyhow::Result<ServiceInstance> + Send + Sync>;

/// Zero-argument producer of a degraded stand-in
pub type FallbackFactory = Arc<dyn Fn() -> anyhow::Result<ServiceInstance> + Send + Sync>;

/// Health check run against the built instance of a service
pub type HealthCheckFn =
    Arc<dyn Fn(ServiceInstance) -> BoxFuture<'static, anyhow::Result<ProbeResult>> + Send + Sync>;

/// Wrap a value as a [`ServiceInstance`]
pub fn service<T: Any + Send + Sync>(value: T) -> ServiceInstance {
    Arc::new(value)
}

#[derive(Clone)]
pub enum Implementation {
    Factory(FactoryFn),
    Constructor(ConstructorFn),
    Instance(ServiceInstance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationKind {
    Factory,
    Constructor,
    Instance,
}

impl std::fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImplementationKind::Factory => write!(f, "async factory"),
            ImplementationKind::Constructor => write!(f, "constructor"),
            ImplementationKind::Instance => write!(f, "existing instance"),
        }
    }
}

impl Implementation {
    pub fn factory<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolvedDependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ServiceInstance>> + Send + 'static,
    {
        Implementation::Factory(Arc::new(move |deps| f(deps).boxed()))
    }

    pub fn constructor<F>(f: F) -> Self
    where
        F: Fn(&ResolvedDependencies) -> anyhow::Result<ServiceInstance> + Send + Sync + 'static,
    {
        Implementation::Constructor(Arc::new(f))
    }

    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Implementation::Instance(service(value))
    }

    pub fn kind(&self) -> ImplementationKind {
        match self {
            Implementation::Factory(_) => ImplementationKind::Factory,
            Implementation::Constructor(_) => ImplementationKind::Constructor,
            Implementation::Instance(_) => ImplementationKind::Instance,
        }
    }

    /// Build the service. Panics inside user code are reported as errors.
    pub(crate) async fn instantiate(
        &self,
        dependencies: &ResolvedDependencies,
    ) -> anyhow::Result<ServiceInstance> {
        match self {
            Implementation::Factory(factory) => {
                let fut = factory(dependencies.clone());
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(anyhow::anyhow!("factory panicked: {}", panic_message(&*panic))),
                }
            }
            Implementation::Constructor(constructor) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| constructor(dependencies))) {
                    Ok(result) => result,
                    Err(panic) => Err(anyhow::anyhow!(
                        "constructor panicked: {}",
                        panic_message(&*panic)
                    )),
                }
            }
            Implementation::Instance(instance) => Ok(instance.clone()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Dependencies of a service, in declaration order
#[derive(Clone, Default)]
pub struct ResolvedDependencies {
    entries: Vec<(String, ServiceInstance)>,
}

impl ResolvedDependencies {
    pub fn new(entries: Vec<(String, ServiceInstance)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn instance(&self, name: &str) -> Option<&ServiceInstance> {
        self.entries
            .iter()
            .find(|(dep, _)| dep == name)
            .map(|(_, instance)| instance)
    }

    /// Typed lookup by dependency name
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> anyhow::Result<Arc<T>> {
        let instance = self
            .instance(name)
            .ok_or_else(|| anyhow::anyhow!("Dependency {} was not resolved", name))?;
        downcast(name, instance)
    }

    /// Typed lookup by position
    pub fn at<T: Any + Send + Sync>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let (name, instance) = self
            .entries
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("No dependency at position {}", index))?;
        downcast(name, instance)
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, instance: &ServiceInstance) -> anyhow::Result<Arc<T>> {
    instance
        .clone()
        .downcast::<T>()
        .map_err(|_| anyhow::anyhow!("Dependency {} is not a {}", name, type_name::<T>()))
}

/// Settings recorded with a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    pub circuit_breaker_enabled: bool,
    pub retries: u32,
    /// Per-dependency resolution timeout
    pub timeout_ms: u64,
}

impl DescriptorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Registered blueprint for a not-yet-built service
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub implementation: Implementation,
    /// Tried once when `implementation` fails
    pub alternate: Option<Implementation>,
    pub dependencies: Vec<String>,
    pub config: DescriptorConfig,
}

/// A built, cached service
#[derive(Clone)]
pub struct InstanceEntry {
    pub instance: ServiceInstance,
    pub registered_at: DateTime<Utc>,
    pub has_health_check: bool,
    pub circuit_breaker_enabled: bool,
}

/// Options accepted by `register` and `register_instance`
#[derive(Clone)]
pub struct ServiceConfig {
    pub(crate) dependencies: Vec<String>,
    pub(crate) fallback: Option<FallbackFactory>,
    pub(crate) health_check: Option<HealthCheckFn>,
    pub(crate) alternate: Option<Implementation>,
    // Unset means the registration kind decides
    pub(crate) circuit_breaker: Option<bool>,
    pub(crate) retries: u32,
    pub(crate) timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
            fallback: None,
            health_check: None,
            alternate: None,
            circuit_breaker: None,
            retries: constants::service::RETRIES,
            timeout: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<ServiceInstance> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn with_health_check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(ServiceInstance) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ProbeResult>> + Send + 'static,
    {
        self.health_check = Some(Arc::new(move |instance| check(instance).boxed()));
        self
    }

    /// Second construction strategy, tried once if the primary one fails
    pub fn with_alternate(mut self, alternate: Implementation) -> Self {
        self.alternate = Some(alternate);
        self
    }

    pub fn circuit_breaker(mut self, enabled: bool) -> Self {
        self.circuit_breaker = Some(enabled);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
