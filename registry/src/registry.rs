// File: registry/src/registry.rs
use crate::constants;
use crate::descriptor::{
    DescriptorConfig, HealthCheckFn, Implementation, InstanceEntry, ResolvedDependencies,
    ServiceConfig, ServiceDescriptor, ServiceInstance,
};
use crate::errors::{RegistryError, RegistryResult};
use crate::fallback::{self, FallbackTable};
use crate::health::{
    HealthMonitor, HealthProbe, HealthSnapshot, MonitorConfig, ProbeFuture, ServiceStatus,
    Thresholds,
};
use crate::status::{AllServicesStatus, ServiceStatusReport, StatusSummary};
use chrono::Utc;
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use std::any::{type_name, Any};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Registry-wide settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub health_check_interval: Duration,
    pub probe_timeout: Duration,
    pub status_history_limit: usize,
    pub healthy_threshold: u32,
    pub failed_threshold: u32,
    /// Used for descriptors registered without an explicit timeout
    pub default_dependency_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_check_interval: constants::health::CHECK_INTERVAL,
            probe_timeout: constants::health::PROBE_TIMEOUT,
            status_history_limit: constants::health::STATUS_HISTORY_LIMIT,
            healthy_threshold: constants::health::HEALTHY_THRESHOLD,
            failed_threshold: constants::health::FAILED_THRESHOLD,
            default_dependency_timeout: constants::service::DEPENDENCY_TIMEOUT,
        }
    }
}

impl RegistryConfig {
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: self.health_check_interval,
            probe_timeout: self.probe_timeout,
            history_limit: self.status_history_limit,
            thresholds: Thresholds {
                healthy_after: self.healthy_threshold,
                failed_after: self.failed_threshold,
            },
        }
    }
}

#[derive(Default)]
struct RegistryState {
    services: HashMap<String, ServiceDescriptor>,
    instances: HashMap<String, InstanceEntry>,
    aliases: HashMap<String, String>,
    fallbacks: FallbackTable,
    // Bumped by clear() so builds started before it are not cached
    generation: u64,
}

impl RegistryState {
    fn canonical(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Walk the descriptor graph from `start`; cached instances end a branch
    fn find_cycle(&self, start: &str) -> Option<Vec<String>> {
        fn visit(
            state: &RegistryState,
            name: &str,
            path: &mut Vec<String>,
            done: &mut HashSet<String>,
        ) -> Option<Vec<String>> {
            let name = state.canonical(name);
            if let Some(pos) = path.iter().position(|seen| *seen == name) {
                let mut cycle = path[pos..].to_vec();
                cycle.push(name);
                return Some(cycle);
            }
            if done.contains(&name) || state.instances.contains_key(&name) {
                return None;
            }
            let descriptor = state.services.get(&name)?;

            path.push(name.clone());
            for dependency in &descriptor.dependencies {
                if let Some(cycle) = visit(state, dependency, path, done) {
                    return Some(cycle);
                }
            }
            path.pop();
            done.insert(name);
            None
        }

        visit(self, start, &mut Vec::new(), &mut HashSet::new())
    }
}

type InFlight = Shared<BoxFuture<'static, RegistryResult<ServiceInstance>>>;

/// Named-service container with dependency resolution, health-gated
/// caching and fallbacks.
///
/// Cloning is cheap and every clone shares the same state.
///
/// Lifecycle: `new` -> `register*` -> `resolve*` -> `shutdown`. Registering a
/// health check spawns a probe task, so registration must happen inside a
/// tokio runtime. `shutdown` stops probing at once; without it, probe tasks
/// end on their next tick after the last clone is dropped.
#[derive(Clone)]
pub struct ServiceRegistry {
    config: RegistryConfig,
    state: Arc<RwLock<RegistryState>>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    health_monitor: HealthMonitor,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let health_monitor = HealthMonitor::new(config.monitor_config());
        Self {
            config,
            state: Arc::new(RwLock::new(RegistryState::default())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            health_monitor,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn health_monitor(&self) -> &HealthMonitor {
        &self.health_monitor
    }

    /// Store a blueprint for `name`. Fallback and health check from `config`
    /// are registered alongside; the health check starts probing right away.
    pub async fn register(&self, name: &str, implementation: Implementation, config: ServiceConfig) {
        let ServiceConfig {
            dependencies,
            fallback,
            health_check,
            alternate,
            circuit_breaker,
            retries,
            timeout: dependency_timeout,
        } = config;

        let timeout = dependency_timeout.unwrap_or(self.config.default_dependency_timeout);
        let descriptor = ServiceDescriptor {
            name: name.to_string(),
            implementation,
            alternate,
            dependencies,
            config: DescriptorConfig {
                circuit_breaker_enabled: circuit_breaker
                    .unwrap_or(constants::service::CIRCUIT_BREAKER_ENABLED),
                retries,
                timeout_ms: timeout.as_millis() as u64,
            },
        };
        let dependency_count = descriptor.dependencies.len();
        let has_fallback = fallback.is_some();
        let has_health_check = health_check.is_some();

        {
            let mut state = self.state.write().await;
            state.services.insert(name.to_string(), descriptor);
            if let Some(fallback) = fallback {
                state.fallbacks.insert(name, fallback);
            }
        }

        if let Some(check) = health_check {
            let probe = self.instance_probe(name, check);
            self.health_monitor.register_health_check(name, probe).await;
        }

        info!(
            "Service registered: {} ({} dependencies, fallback: {}, health check: {})",
            name, dependency_count, has_fallback, has_health_check
        );
    }

    /// Cache an already built value under `name`, bypassing dependency
    /// resolution. The value is also kept as the service's blueprint so a
    /// forced re-registration can restore it.
    pub async fn register_instance(&self, name: &str, instance: ServiceInstance, config: ServiceConfig) {
        let has_health_check = config.health_check.is_some();
        let circuit_breaker_enabled = config
            .circuit_breaker
            .unwrap_or(constants::service::INSTANCE_CIRCUIT_BREAKER_ENABLED);
        let entry = InstanceEntry {
            instance: instance.clone(),
            registered_at: Utc::now(),
            has_health_check,
            circuit_breaker_enabled,
        };

        {
            let mut state = self.state.write().await;
            state.instances.insert(name.to_string(), entry);
            state.services.insert(
                name.to_string(),
                ServiceDescriptor {
                    name: name.to_string(),
                    implementation: Implementation::Instance(instance),
                    alternate: None,
                    dependencies: Vec::new(),
                    config: DescriptorConfig {
                        circuit_breaker_enabled,
                        retries: config.retries,
                        timeout_ms: config
                            .timeout
                            .unwrap_or(self.config.default_dependency_timeout)
                            .as_millis() as u64,
                    },
                },
            );
            if let Some(fallback) = config.fallback {
                state.fallbacks.insert(name, fallback);
            }
        }

        if let Some(check) = config.health_check {
            let probe = self.instance_probe(name, check);
            self.health_monitor.register_health_check(name, probe).await;
        }

        info!("Instance registered: {}", name);
    }

    pub async fn register_alias(&self, alias: &str, actual_name: &str) {
        let mut state = self.state.write().await;
        state
            .aliases
            .insert(alias.to_string(), actual_name.to_string());
        debug!("Alias registered: {} -> {}", alias, actual_name);
    }

    async fn canonical_name(&self, name: &str) -> String {
        self.state.read().await.canonical(name)
    }

    /// Probe adapter: runs `check` against whatever instance is cached when
    /// the probe fires, and skips the cycle while nothing is built yet.
    fn instance_probe(&self, name: &str, check: HealthCheckFn) -> HealthProbe {
        let state = Arc::downgrade(&self.state);
        let name = name.to_string();

        Arc::new(move || {
            let state = state.clone();
            let name = name.clone();
            let check = check.clone();
            let probe: ProbeFuture = Box::pin(async move {
                let Some(state) = state.upgrade() else {
                    return Ok(None);
                };
                let instance = state
                    .read()
                    .await
                    .instances
                    .get(&name)
                    .map(|entry| entry.instance.clone());
                match instance {
                    Some(instance) => check(instance).await.map(Some),
                    None => Ok(None),
                }
            });
            probe
        })
    }

    /// Resolve `name` (or its alias) to a live instance.
    ///
    /// An `Ok` value may be a degraded stand-in produced by the service's
    /// fallback. `Err(NotRegistered)` is never absorbed by a fallback;
    /// `Err(Unavailable)` means the service could not be provided at all.
    #[instrument(skip(self))]
    pub async fn resolve(&self, name: &str) -> RegistryResult<ServiceInstance> {
        self.resolve_boxed(name.to_string()).await
    }

    /// Resolve and downcast to a concrete type
    pub async fn resolve_as<T: Any + Send + Sync>(&self, name: &str) -> RegistryResult<Arc<T>> {
        let instance = self.resolve(name).await?;
        instance
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                service: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    // Boxed so that dependency resolution can recurse through it
    fn resolve_boxed(&self, name: String) -> BoxFuture<'static, RegistryResult<ServiceInstance>> {
        let registry = self.clone();
        async move {
            let service = registry.canonical_name(&name).await;

            let (cached, descriptor) = {
                let state = registry.state.read().await;
                (
                    state
                        .instances
                        .get(&service)
                        .map(|entry| entry.instance.clone()),
                    state.services.get(&service).cloned(),
                )
            };
            let status = registry.health_monitor.status_of(&service).await;

            if let Some(instance) = cached {
                if status != ServiceStatus::Failed {
                    return Ok(instance);
                }
                warn!("Attempting to resolve failed service: {}", service);
                return registry
                    .handle_service_failure(&service, failed_health(&service))
                    .await;
            }

            let Some(descriptor) = descriptor else {
                return Err(RegistryError::NotRegistered { service });
            };

            if status == ServiceStatus::Failed {
                warn!("Service {} is failed, attempting fallback", service);
                return registry
                    .handle_service_failure(&service, failed_health(&service))
                    .await;
            }

            if let Some(path) = registry.state.read().await.find_cycle(&service) {
                error!("Dependency cycle while resolving {}: {}", service, path.join(" -> "));
                return Err(RegistryError::DependencyCycle { service, path });
            }

            registry.join_or_build(service, descriptor).await
        }
        .boxed()
    }

    /// Concurrent first-use resolutions of one name share a single build.
    /// The build runs as its own task, so a caller giving up (timeout) does
    /// not stop it from finishing and populating the cache.
    async fn join_or_build(
        &self,
        service: String,
        descriptor: ServiceDescriptor,
    ) -> RegistryResult<ServiceInstance> {
        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&service) {
                Some(existing) => {
                    debug!("Joining in-flight resolution of {}", service);
                    existing.clone()
                }
                None => {
                    // A build may have finished between the cache check and here
                    let cached = self
                        .state
                        .read()
                        .await
                        .instances
                        .get(&service)
                        .map(|entry| entry.instance.clone());
                    if let Some(instance) = cached {
                        return Ok(instance);
                    }

                    let registry = self.clone();
                    let name = service.clone();
                    let handle = tokio::spawn(async move {
                        let result = registry.build_or_fallback(&name, descriptor).await;
                        registry.in_flight.lock().await.remove(&name);
                        result
                    });

                    let name = service.clone();
                    let shared = async move {
                        handle.await.unwrap_or_else(|e| {
                            Err(RegistryError::Unavailable {
                                service: name,
                                reason: format!("resolution task aborted: {}", e),
                            })
                        })
                    }
                    .boxed()
                    .shared();

                    in_flight.insert(service.clone(), shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    async fn build_or_fallback(
        &self,
        service: &str,
        descriptor: ServiceDescriptor,
    ) -> RegistryResult<ServiceInstance> {
        let generation = self.state.read().await.generation;

        match self.instantiate(&descriptor).await {
            Ok(instance) => {
                let has_health_check = self.health_monitor.is_monitored(service).await;
                let mut state = self.state.write().await;
                if state.generation != generation {
                    warn!(
                        "Registry cleared while {} was being built; instance not cached",
                        service
                    );
                    return Ok(instance);
                }
                state.instances.insert(
                    service.to_string(),
                    InstanceEntry {
                        instance: instance.clone(),
                        registered_at: Utc::now(),
                        has_health_check,
                        circuit_breaker_enabled: descriptor.config.circuit_breaker_enabled,
                    },
                );
                info!("Service resolved successfully: {}", service);
                Ok(instance)
            }
            Err(e) => {
                error!("Failed to resolve service {}: {}", service, e);
                self.handle_service_failure(service, e).await
            }
        }
    }

    async fn instantiate(&self, descriptor: &ServiceDescriptor) -> RegistryResult<ServiceInstance> {
        let dependencies = self.resolve_dependencies(descriptor).await?;
        let service = &descriptor.name;
        let primary = descriptor.implementation.kind();

        let primary_error = match descriptor.implementation.instantiate(&dependencies).await {
            Ok(instance) => {
                debug!("Created {} using {}", service, primary);
                return Ok(instance);
            }
            Err(e) => e,
        };

        warn!(
            "Failed to instantiate {} with {} ({} dependencies): {}",
            service,
            primary,
            dependencies.len(),
            primary_error
        );

        let Some(alternate) = &descriptor.alternate else {
            return Err(RegistryError::Instantiation {
                service: service.clone(),
                reason: primary_error.to_string(),
            });
        };

        match alternate.instantiate(&dependencies).await {
            Ok(instance) => {
                warn!("Created {} using alternate {}", service, alternate.kind());
                Ok(instance)
            }
            Err(retry_error) => {
                error!(
                    "Failed to instantiate {} with both {} and {}: {} / {}",
                    service,
                    primary,
                    alternate.kind(),
                    primary_error,
                    retry_error
                );
                Err(RegistryError::Instantiation {
                    service: service.clone(),
                    reason: format!("{}; alternate {}: {}", primary_error, alternate.kind(), retry_error),
                })
            }
        }
    }

    /// All dependencies are resolved concurrently, each under the
    /// descriptor's timeout. The first failure aborts the whole set.
    async fn resolve_dependencies(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> RegistryResult<ResolvedDependencies> {
        let limit = descriptor.config.timeout();

        let pending = descriptor.dependencies.iter().map(|dependency| {
            let service = descriptor.name.clone();
            let dependency = dependency.clone();
            let resolution = self.resolve_boxed(dependency.clone());
            async move {
                match timeout(limit, resolution).await {
                    Ok(Ok(instance)) => Ok((dependency, instance)),
                    Ok(Err(e)) => {
                        error!(
                            "Failed to resolve dependency {} for service {}: {}",
                            dependency, service, e
                        );
                        Err(RegistryError::DependencyFailed {
                            service,
                            dependency,
                            reason: e.to_string(),
                        })
                    }
                    Err(_) => {
                        error!(
                            "Dependency resolution timeout: {} for service {} after {}ms",
                            dependency,
                            service,
                            limit.as_millis()
                        );
                        Err(RegistryError::DependencyTimeout {
                            service,
                            dependency,
                            timeout_ms: limit.as_millis() as u64,
                        })
                    }
                }
            }
        });

        let resolved = try_join_all(pending).await?;
        Ok(ResolvedDependencies::new(resolved))
    }

    /// Last line of defence: hand out the fallback if one is registered.
    /// Without a usable fallback the original cause is returned, or
    /// `Unavailable` when the fallback itself failed.
    pub async fn handle_service_failure(
        &self,
        service: &str,
        cause: RegistryError,
    ) -> RegistryResult<ServiceInstance> {
        let fallback = self.state.read().await.fallbacks.get(service);

        let Some(fallback) = fallback else {
            warn!("No fallback available for service {}: {}", service, cause);
            return Err(cause);
        };

        info!("Using fallback for failed service: {}", service);
        match fallback::invoke(&fallback) {
            Ok(instance) => {
                warn!("Service {} resolved in degraded mode ({})", service, cause);
                Ok(instance)
            }
            Err(e) => {
                error!("Fallback failed for service {}: {}", service, e);
                Err(RegistryError::Unavailable {
                    service: service.to_string(),
                    reason: format!("{}; fallback failed: {}", cause, e),
                })
            }
        }
    }

    pub async fn get_service_status(&self, name: &str) -> ServiceStatusReport {
        let service = self.canonical_name(name).await;
        let health = self.health_monitor.get_service_status(&service).await;
        let state = self.state.read().await;
        build_report(&state, service, health)
    }

    /// Status of every known service plus counts per health status
    pub async fn get_all_services_status(&self) -> AllServicesStatus {
        let names = self.registered_names().await;
        let mut services = Vec::with_capacity(names.len());
        for name in names {
            let health = self.health_monitor.get_service_status(&name).await;
            let state = self.state.read().await;
            services.push(build_report(&state, name, health));
        }

        let summary = StatusSummary::tally(&services);
        AllServicesStatus {
            services,
            summary,
            timestamp: Utc::now(),
        }
    }

    /// True only for HEALTHY or DEGRADED; UNKNOWN is not available
    pub async fn is_service_available(&self, name: &str) -> bool {
        let service = self.canonical_name(name).await;
        self.health_monitor.status_of(&service).await.is_available()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.is_service_available(name).await
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        let state = self.state.read().await;
        let service = state.canonical(name);
        state.services.contains_key(&service) || state.instances.contains_key(&service)
    }

    /// Names of all descriptors and cached instances, sorted
    pub async fn registered_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let names: BTreeSet<String> = state
            .services
            .keys()
            .chain(state.instances.keys())
            .cloned()
            .collect();
        names.into_iter().collect()
    }

    /// Run one health probe for `name` now. `None` when no check is registered.
    pub async fn run_health_check(&self, name: &str) -> Option<ServiceStatus> {
        let service = self.canonical_name(name).await;
        self.health_monitor.perform_health_check(&service).await
    }

    /// Drop the cached instance and reset health to UNKNOWN; the next
    /// `resolve` rebuilds the service.
    pub async fn force_re_register(&self, name: &str) {
        let service = self.canonical_name(name).await;
        let evicted = self.state.write().await.instances.remove(&service).is_some();
        let reset = self.health_monitor.reset(&service).await;
        info!(
            "Service {} marked for re-registration (instance evicted: {}, health reset: {})",
            service, evicted, reset
        );
    }

    /// Forget every descriptor, instance, fallback, alias and health record,
    /// and stop all probe tasks.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.services.clear();
            state.instances.clear();
            state.fallbacks.clear();
            state.aliases.clear();
            state.generation += 1;
        }
        self.in_flight.lock().await.clear();
        self.health_monitor.clear().await;
        info!("Service registry cleared");
    }

    /// Stop all background probing. Reads and resolves keep working.
    pub async fn shutdown(&self) {
        self.health_monitor.shutdown().await;
        info!("Service registry shut down");
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn failed_health(service: &str) -> RegistryError {
    RegistryError::Unavailable {
        service: service.to_string(),
        reason: "health status is FAILED".to_string(),
    }
}

fn build_report(state: &RegistryState, name: String, health: HealthSnapshot) -> ServiceStatusReport {
    let descriptor = state.services.get(&name);
    let instance = state.instances.get(&name);

    ServiceStatusReport {
        registered: descriptor.is_some(),
        instantiated: instance.is_some(),
        implementation: descriptor.map(|d| d.implementation.kind()),
        dependencies: descriptor
            .map(|d| d.dependencies.clone())
            .unwrap_or_default(),
        has_fallback: state.fallbacks.contains(&name),
        health,
        registered_at: instance.map(|i| i.registered_at),
        config: descriptor.map(|d| d.config),
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::service;

    #[tokio::test]
    async fn test_find_cycle_reports_path() {
        let registry = ServiceRegistry::new();
        let noop = || Implementation::constructor(|_| Ok(service(())));
        registry
            .register("A", noop(), ServiceConfig::new().depends_on("B"))
            .await;
        registry
            .register("B", noop(), ServiceConfig::new().depends_on("C"))
            .await;
        registry
            .register("C", noop(), ServiceConfig::new().depends_on("A"))
            .await;

        let state = registry.state.read().await;
        let cycle = state.find_cycle("A").unwrap();
        assert_eq!(cycle, vec!["A", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_find_cycle_follows_aliases_and_stops_at_instances() {
        let registry = ServiceRegistry::new();
        let noop = || Implementation::constructor(|_| Ok(service(())));
        registry
            .register("Repo", noop(), ServiceConfig::new().depends_on("DB"))
            .await;
        registry.register_alias("DB", "DatabaseClient").await;
        registry
            .register("DatabaseClient", noop(), ServiceConfig::new().depends_on("Repo"))
            .await;

        {
            let state = registry.state.read().await;
            assert_eq!(
                state.find_cycle("Repo").unwrap(),
                vec!["Repo", "DatabaseClient", "Repo"]
            );
        }

        registry
            .register_instance("DatabaseClient", service(()), ServiceConfig::new())
            .await;
        let state = registry.state.read().await;
        assert!(state.find_cycle("Repo").is_none());
    }

    #[tokio::test]
    async fn test_descriptor_timeout_defaults_to_registry_config() {
        let registry = ServiceRegistry::with_config(RegistryConfig {
            default_dependency_timeout: Duration::from_millis(1500),
            ..RegistryConfig::default()
        });
        registry
            .register("Svc", Implementation::instance(1u8), ServiceConfig::new())
            .await;
        registry
            .register(
                "Tight",
                Implementation::instance(2u8),
                ServiceConfig::new().timeout(Duration::from_millis(10)),
            )
            .await;

        let svc = registry.get_service_status("Svc").await;
        assert_eq!(svc.config.unwrap().timeout_ms, 1500);
        let tight = registry.get_service_status("Tight").await;
        assert_eq!(tight.config.unwrap().timeout_ms, 10);
    }
}
