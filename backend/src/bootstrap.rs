//! Registers the backend's services with a [`ServiceRegistry`]
//!
//! Order: Logger, DatabaseClient (plus the `DB` alias), then the eight
//! repositories. Every repository depends on the database client, falls
//! back to a stub and is probed with a one-row read.

use crate::config::RegistrySettings;
use crate::constants::services;
use crate::database::Database;
use crate::logger::AppLogger;
use crate::repositories::{self, repository_from};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use service_registry::{
    AllServicesStatus, Implementation, ProbeResult, ResolvedDependencies, ServiceConfig,
    ServiceInstance, ServiceRegistry,
};
use std::sync::Arc;
use tracing::{error, info};

type RepositoryFactory = fn(ResolvedDependencies) -> BoxFuture<'static, Result<ServiceInstance>>;

fn repository_factories() -> [(&'static str, RepositoryFactory); 8] {
    [
        (services::PRODUCT_REPOSITORY, |deps| {
            Box::pin(repositories::create_product_repository(deps))
        }),
        (services::USER_REPOSITORY, |deps| {
            Box::pin(repositories::create_user_repository(deps))
        }),
        (services::ORDER_REPOSITORY, |deps| {
            Box::pin(repositories::create_order_repository(deps))
        }),
        (services::PAYMENT_REPOSITORY, |deps| {
            Box::pin(repositories::create_payment_repository(deps))
        }),
        (services::PAYMENT_METHOD_REPOSITORY, |deps| {
            Box::pin(repositories::create_payment_method_repository(deps))
        }),
        (services::OCCASION_REPOSITORY, |deps| {
            Box::pin(repositories::create_occasion_repository(deps))
        }),
        (services::SETTINGS_REPOSITORY, |deps| {
            Box::pin(repositories::create_settings_repository(deps))
        }),
        (services::PRODUCT_IMAGE_REPOSITORY, |deps| {
            Box::pin(repositories::create_product_image_repository(deps))
        }),
    ]
}

async fn logger_health_check(instance: ServiceInstance) -> Result<ProbeResult> {
    Ok(match instance.downcast::<AppLogger>() {
        Ok(logger) => ProbeResult::healthy().with_details(format!("component {}", logger.component())),
        Err(_) => ProbeResult::unhealthy("logger instance missing"),
    })
}

async fn database_health_check(instance: ServiceInstance) -> Result<ProbeResult> {
    let database = instance
        .downcast::<Database>()
        .map_err(|_| anyhow!("database client instance missing"))?;
    let rows = database.from("users")?.select("id").limit(1).fetch().await?;
    Ok(ProbeResult::healthy().with_details(format!("users probe returned {} rows", rows.len())))
}

async fn repository_health_check(instance: ServiceInstance) -> Result<ProbeResult> {
    let repository = repository_from(instance)?;
    repository
        .find_all(&repositories::Filters::new(), Some(1))
        .await?;
    Ok(ProbeResult::healthy())
}

/// Register every backend service and verify the core ones resolve
pub async fn initialize_registry(
    registry: &ServiceRegistry,
    logger: Arc<AppLogger>,
    database: Arc<Database>,
    settings: &RegistrySettings,
) -> Result<()> {
    info!("Initializing service registry");

    let logger_instance: ServiceInstance = logger;
    registry
        .register_instance(
            services::LOGGER,
            logger_instance,
            ServiceConfig::new().with_health_check(logger_health_check),
        )
        .await;

    let database_instance: ServiceInstance = database;
    registry
        .register_instance(
            services::DATABASE_CLIENT,
            database_instance,
            ServiceConfig::new().with_health_check(database_health_check),
        )
        .await;
    registry
        .register_alias(services::DB_ALIAS, services::DATABASE_CLIENT)
        .await;

    for (name, factory) in repository_factories() {
        registry
            .register(
                name,
                Implementation::factory(factory),
                ServiceConfig::new()
                    .depends_on(services::DATABASE_CLIENT)
                    .with_fallback(move || Ok(repositories::stub_instance(name)))
                    .with_health_check(repository_health_check)
                    .timeout(settings.repository_timeout()),
            )
            .await;
    }

    for core in [services::LOGGER, services::DATABASE_CLIENT] {
        if let Err(e) = registry.resolve(core).await {
            error!("Core service {} failed to resolve: {}", core, e);
            return Err(anyhow!("Core service {} unavailable: {}", core, e));
        }
    }

    info!(
        "Service registry initialized with {} services",
        registry.registered_names().await.len()
    );
    Ok(())
}

/// Drop every registration and run the bootstrap again
pub async fn reinitialize_services(
    registry: &ServiceRegistry,
    logger: Arc<AppLogger>,
    database: Arc<Database>,
    settings: &RegistrySettings,
) -> Result<()> {
    info!("Reinitializing all services");
    registry.clear().await;
    initialize_registry(registry, logger, database, settings).await
}

pub async fn service_registry_status(registry: &ServiceRegistry) -> AllServicesStatus {
    registry.get_all_services_status().await
}
