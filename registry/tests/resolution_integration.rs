//! Integration tests for service resolution
//!
//! These tests cover caching, aliases, dependency injection, construction
//! strategies, fallbacks and the failure modes of `resolve`.

mod common;

use common::fixtures::*;
use futures::future::join_all;
use service_registry::{
    service, Implementation, RegistryError, ResolvedDependencies, ServiceConfig, ServiceRegistry,
};
use std::sync::Arc;
use std::time::Duration;

fn foo_factory(counter: BuildCounter) -> Implementation {
    Implementation::factory(move |deps: ResolvedDependencies| {
        let counter = counter.clone();
        async move {
            counter.bump();
            let config = deps.get::<AppConfig>(services::CONFIG)?;
            Ok(service(Foo { config }))
        }
    })
}

fn slow_config(delay: Duration, name: &'static str) -> Implementation {
    Implementation::factory(move |_| async move {
        tokio::time::sleep(delay).await;
        Ok(service(AppConfig::new(name)))
    })
}

#[tokio::test]
async fn test_resolve_injects_dependencies_and_caches() {
    let registry = ServiceRegistry::new();
    let counter = BuildCounter::default();

    registry
        .register_instance(
            services::CONFIG,
            service(AppConfig::new("floresya")),
            ServiceConfig::new(),
        )
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(counter.clone()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;

    let first = registry.resolve_as::<Foo>(services::FOO).await.unwrap();
    let second = registry.resolve_as::<Foo>(services::FOO).await.unwrap();

    assert_eq!(first.config.name, "floresya");
    assert!(Arc::ptr_eq(&first, &second), "Second resolve should hit the cache");
    assert_eq!(counter.count(), 1);

    let status = registry.get_service_status(services::FOO).await;
    assert!(status.registered);
    assert!(status.instantiated);
    assert_eq!(status.dependencies, vec![services::CONFIG]);
}

#[tokio::test]
async fn test_unregistered_service_is_an_error() {
    let registry = ServiceRegistry::new();

    let err = registry.resolve(services::UNKNOWN).await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::NotRegistered {
            service: services::UNKNOWN.to_string()
        }
    );
    assert!(!registry.has(services::UNKNOWN).await);
}

#[tokio::test]
async fn test_alias_resolves_to_same_instance() {
    let registry = ServiceRegistry::new();
    registry
        .register(
            services::DATABASE,
            Implementation::constructor(|_| Ok(service(AppConfig::new("sqlite")))),
            ServiceConfig::new(),
        )
        .await;
    registry
        .register_alias(services::DB_ALIAS, services::DATABASE)
        .await;

    let via_alias = registry.resolve(services::DB_ALIAS).await.unwrap();
    let direct = registry.resolve(services::DATABASE).await.unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));

    let status = registry.get_service_status(services::DB_ALIAS).await;
    assert_eq!(status.name, services::DATABASE);
}

#[tokio::test]
async fn test_alternate_constructor_used_when_factory_fails() {
    let registry = ServiceRegistry::new();
    registry
        .register_instance(services::CONFIG, service(AppConfig::new("cfg")), ServiceConfig::new())
        .await;
    registry
        .register(
            services::FOO,
            Implementation::factory(|_| async { Err(anyhow::anyhow!("createFoo is not a factory")) }),
            ServiceConfig::new()
                .depends_on(services::CONFIG)
                .with_alternate(Implementation::constructor(|deps| {
                    let config = deps.at::<AppConfig>(0)?;
                    Ok(service(Foo { config }))
                })),
        )
        .await;

    let foo = registry.resolve_as::<Foo>(services::FOO).await.unwrap();
    assert_eq!(foo.config.name, "cfg");
}

#[tokio::test]
async fn test_both_strategies_failing_reports_instantiation_error() {
    let registry = ServiceRegistry::new();
    registry
        .register(
            services::FOO,
            Implementation::factory(|_| async { Err(anyhow::anyhow!("factory broke")) }),
            ServiceConfig::new().with_alternate(Implementation::constructor(|_| {
                Err(anyhow::anyhow!("constructor broke"))
            })),
        )
        .await;

    match registry.resolve(services::FOO).await {
        Err(RegistryError::Instantiation { service, reason }) => {
            assert_eq!(service, services::FOO);
            assert!(reason.contains("factory broke"));
            assert!(reason.contains("constructor broke"));
        }
        other => panic!("Expected instantiation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_fallback_absorbs_failures_and_is_not_cached() {
    let registry = ServiceRegistry::new();
    let counter = BuildCounter::default();
    let attempts = counter.clone();

    registry
        .register(
            services::FOO,
            Implementation::factory(move |_| {
                let attempts = attempts.clone();
                async move {
                    attempts.bump();
                    Err(anyhow::anyhow!("database unreachable"))
                }
            }),
            ServiceConfig::new().with_fallback(|| degraded("foo-stub")),
        )
        .await;

    let first = registry.resolve_as::<Degraded>(services::FOO).await.unwrap();
    assert_eq!(*first, Degraded("foo-stub"));

    registry.resolve(services::FOO).await.unwrap();
    assert_eq!(counter.count(), 2, "Fallback results must not be cached");

    let status = registry.get_service_status(services::FOO).await;
    assert!(status.has_fallback);
    assert!(!status.instantiated);
}

#[tokio::test]
async fn test_failing_fallback_reports_unavailable() {
    let registry = ServiceRegistry::new();
    registry
        .register(
            services::FOO,
            Implementation::constructor(|_| Err(anyhow::anyhow!("no connection"))),
            ServiceConfig::new().with_fallback(|| Err(anyhow::anyhow!("no stub either"))),
        )
        .await;

    let err = registry.resolve(services::FOO).await.unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable { .. }));
    assert!(err.to_string().contains("no stub either"));
}

#[tokio::test]
async fn test_missing_dependency_fails_dependent() {
    let registry = ServiceRegistry::new();
    registry
        .register(
            services::FOO,
            foo_factory(BuildCounter::default()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;

    match registry.resolve(services::FOO).await {
        Err(RegistryError::DependencyFailed {
            service,
            dependency,
            reason,
        }) => {
            assert_eq!(service, services::FOO);
            assert_eq!(dependency, services::CONFIG);
            assert!(reason.contains("not registered"));
        }
        other => panic!("Expected dependency failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_dependency_times_out() {
    let registry = ServiceRegistry::with_config(fast_timeout_config(100));
    registry
        .register(
            services::CONFIG,
            Implementation::factory(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(service(AppConfig::new("late")))
            }),
            ServiceConfig::new(),
        )
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(BuildCounter::default()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;

    let err = registry.resolve(services::FOO).await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::DependencyTimeout {
            service: services::FOO.to_string(),
            dependency: services::CONFIG.to_string(),
            timeout_ms: 100,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_dependency_still_settles_into_cache() {
    let registry = ServiceRegistry::with_config(fast_timeout_config(100));
    registry
        .register(
            services::CONFIG,
            slow_config(Duration::from_secs(5), "late"),
            ServiceConfig::new(),
        )
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(BuildCounter::default()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;

    let err = registry.resolve(services::FOO).await.unwrap_err();
    assert!(matches!(err, RegistryError::DependencyTimeout { .. }));
    assert!(!registry.get_service_status(services::CONFIG).await.instantiated);

    // Only the wait was abandoned; the build itself keeps going
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(registry.get_service_status(services::CONFIG).await.instantiated);

    let foo = registry.resolve_as::<Foo>(services::FOO).await.unwrap();
    assert_eq!(foo.config.name, "late");
}

#[tokio::test(start_paused = true)]
async fn test_dependency_timeout_is_absorbed_by_fallback() {
    let registry = ServiceRegistry::with_config(fast_timeout_config(100));
    registry
        .register(
            services::CONFIG,
            slow_config(Duration::from_secs(5), "late"),
            ServiceConfig::new(),
        )
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(BuildCounter::default()),
            ServiceConfig::new()
                .depends_on(services::CONFIG)
                .with_fallback(|| degraded("foo-stub")),
        )
        .await;

    let foo = registry.resolve_as::<Degraded>(services::FOO).await.unwrap();
    assert_eq!(*foo, Degraded("foo-stub"));
    assert!(!registry.get_service_status(services::FOO).await.instantiated);
}

#[tokio::test(start_paused = true)]
async fn test_dependencies_resolve_concurrently() {
    let registry = ServiceRegistry::new();
    let dependencies = ["Catalog", "Pricing", "Inventory"];
    for name in dependencies {
        registry
            .register(name, slow_config(Duration::from_secs(1), name), ServiceConfig::new())
            .await;
    }
    registry
        .register(
            services::FOO,
            Implementation::constructor(|deps| Ok(service(deps.len()))),
            ServiceConfig::new().dependencies(dependencies),
        )
        .await;

    let started = tokio::time::Instant::now();
    let resolved = registry.resolve_as::<usize>(services::FOO).await.unwrap();

    assert_eq!(*resolved, 3);
    assert!(
        started.elapsed() < Duration::from_millis(1_500),
        "Dependencies were resolved one after another: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_circuit_breaker_defaults_depend_on_registration_kind() {
    let registry = ServiceRegistry::new();
    registry
        .register_instance(services::CONFIG, service(AppConfig::new("x")), ServiceConfig::new())
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(BuildCounter::default()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;
    registry
        .register_instance(
            services::LOGGER,
            service(AppConfig::new("log")),
            ServiceConfig::new().circuit_breaker(true),
        )
        .await;

    let breaker = |status: service_registry::ServiceStatusReport| {
        status.config.map(|config| config.circuit_breaker_enabled)
    };
    assert_eq!(breaker(registry.get_service_status(services::CONFIG).await), Some(false));
    assert_eq!(breaker(registry.get_service_status(services::FOO).await), Some(true));
    assert_eq!(breaker(registry.get_service_status(services::LOGGER).await), Some(true));

    // The restored blueprint keeps the instance default
    registry.force_re_register(services::CONFIG).await;
    registry.resolve(services::CONFIG).await.unwrap();
    assert_eq!(breaker(registry.get_service_status(services::CONFIG).await), Some(false));
}

#[tokio::test]
async fn test_dependency_cycle_is_detected() {
    let registry = ServiceRegistry::new();
    let noop = || Implementation::constructor(|_| Ok(service(())));
    registry
        .register("A", noop(), ServiceConfig::new().depends_on("B"))
        .await;
    registry
        .register("B", noop(), ServiceConfig::new().depends_on("A"))
        .await;

    let err = registry.resolve("A").await.unwrap_err();
    assert!(err.is_configuration_error());
    match err {
        RegistryError::DependencyCycle { path, .. } => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("Expected cycle, got {}", other),
    }
}

#[tokio::test]
async fn test_concurrent_first_resolution_builds_once() {
    let registry = ServiceRegistry::new();
    let counter = BuildCounter::default();
    let builds = counter.clone();

    registry
        .register(
            services::FOO,
            Implementation::factory(move |_| {
                let builds = builds.clone();
                async move {
                    builds.bump();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(service(Foo {
                        config: Arc::new(AppConfig::new("shared")),
                    }))
                }
            }),
            ServiceConfig::new(),
        )
        .await;

    let results = join_all((0..10).map(|_| registry.resolve(services::FOO))).await;
    let instances: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(counter.count(), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

#[tokio::test]
async fn test_resolve_as_wrong_type_is_type_mismatch() {
    let registry = ServiceRegistry::new();
    registry
        .register_instance(services::CONFIG, service(AppConfig::new("x")), ServiceConfig::new())
        .await;

    let err = registry.resolve_as::<Foo>(services::CONFIG).await.unwrap_err();
    assert!(matches!(err, RegistryError::TypeMismatch { .. }));
}

#[tokio::test]
async fn test_force_re_register_rebuilds_factory_service() {
    let registry = ServiceRegistry::new();
    let counter = BuildCounter::default();
    registry
        .register_instance(services::CONFIG, service(AppConfig::new("x")), ServiceConfig::new())
        .await;
    registry
        .register(
            services::FOO,
            foo_factory(counter.clone()),
            ServiceConfig::new().depends_on(services::CONFIG),
        )
        .await;

    let before = registry.resolve(services::FOO).await.unwrap();
    registry.force_re_register(services::FOO).await;
    let after = registry.resolve(services::FOO).await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(counter.count(), 2);
}

#[tokio::test]
async fn test_force_re_register_keeps_registered_instance() {
    let registry = ServiceRegistry::new();
    let config = service(AppConfig::new("pinned"));
    registry
        .register_instance(services::CONFIG, config.clone(), ServiceConfig::new())
        .await;

    registry.force_re_register(services::CONFIG).await;
    let resolved = registry.resolve(services::CONFIG).await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &config));
}

#[tokio::test]
async fn test_clear_forgets_everything() {
    let registry = ServiceRegistry::new();
    registry
        .register_instance(services::CONFIG, service(AppConfig::new("x")), ServiceConfig::new())
        .await;
    registry
        .register_alias(services::DB_ALIAS, services::CONFIG)
        .await;
    registry.resolve(services::CONFIG).await.unwrap();

    registry.clear().await;

    assert!(matches!(
        registry.resolve(services::CONFIG).await,
        Err(RegistryError::NotRegistered { .. })
    ));
    assert!(matches!(
        registry.resolve(services::DB_ALIAS).await,
        Err(RegistryError::NotRegistered { .. })
    ));
    assert!(registry.registered_names().await.is_empty());
}
