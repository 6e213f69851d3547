//! Data-access repositories.
//!
//! - `table` - database-backed implementation shared by every repository
//! - `stub` - degraded stand-ins handed out when the database is unusable
//!
//! Repositories travel through the registry as `Arc<dyn Repository>` (or
//! `Arc<dyn ProductRepository>` for products) wrapped in a
//! `ServiceInstance`; use [`repository_from`] / [`product_repository_from`]
//! to get them back out.

pub mod stub;
pub mod table;

pub use stub::{StubProductRepository, StubRepository};
pub use table::TableRepository;

use crate::constants::{services, tables};
use crate::database::Database;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use service_registry::{
    service, RegistryError, RegistryResult, ResolvedDependencies, ServiceInstance, ServiceRegistry,
};
use std::sync::Arc;

/// Equality filters, field name to expected value
pub type Filters = Map<String, Value>;

#[async_trait]
pub trait Repository: Send + Sync {
    fn name(&self) -> &str;

    /// Active rows unless `filters` says otherwise
    async fn find_all(&self, filters: &Filters, limit: Option<u32>) -> Result<Vec<Value>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Value>>;
    async fn create(&self, data: Value) -> Result<Value>;
    async fn update(&self, id: i64, data: Value) -> Result<Value>;
    /// Soft delete: the row stays, `active` becomes false
    async fn delete(&self, id: i64) -> Result<Value>;
    async fn count(&self, filters: &Filters) -> Result<i64>;
}

#[async_trait]
pub trait ProductRepository: Repository {
    async fn find_featured(&self, limit: Option<u32>) -> Result<Vec<Value>>;
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Value>>;
    async fn update_stock(&self, id: i64, stock: i64) -> Result<Value>;
    async fn decrement_stock(&self, id: i64, quantity: i64) -> Result<Value>;

    fn as_repository(self: Arc<Self>) -> Arc<dyn Repository>;
}

pub fn repository_instance(repository: Arc<dyn Repository>) -> ServiceInstance {
    service(repository)
}

pub fn product_repository_instance(repository: Arc<dyn ProductRepository>) -> ServiceInstance {
    service(repository)
}

/// Recover a repository from a registry value of either flavour
pub fn repository_from(instance: ServiceInstance) -> Result<Arc<dyn Repository>> {
    if let Some(repository) = instance.downcast_ref::<Arc<dyn Repository>>() {
        return Ok(repository.clone());
    }
    if let Some(product) = instance.downcast_ref::<Arc<dyn ProductRepository>>() {
        return Ok(product.clone().as_repository());
    }
    Err(anyhow!("service instance is not a repository"))
}

pub fn product_repository_from(instance: ServiceInstance) -> Result<Arc<dyn ProductRepository>> {
    instance
        .downcast_ref::<Arc<dyn ProductRepository>>()
        .cloned()
        .ok_or_else(|| anyhow!("service instance is not a product repository"))
}

pub async fn resolve_repository(
    registry: &ServiceRegistry,
    name: &str,
) -> RegistryResult<Arc<dyn Repository>> {
    let instance = registry.resolve(name).await?;
    repository_from(instance).map_err(|_| RegistryError::TypeMismatch {
        service: name.to_string(),
        expected: "Arc<dyn Repository>",
    })
}

pub async fn resolve_product_repository(
    registry: &ServiceRegistry,
) -> RegistryResult<Arc<dyn ProductRepository>> {
    let instance = registry.resolve(services::PRODUCT_REPOSITORY).await?;
    product_repository_from(instance).map_err(|_| RegistryError::TypeMismatch {
        service: services::PRODUCT_REPOSITORY.to_string(),
        expected: "Arc<dyn ProductRepository>",
    })
}

fn database_from(deps: &ResolvedDependencies) -> Result<Arc<Database>> {
    deps.get::<Database>(services::DATABASE_CLIENT)
}

async fn create_table_repository(
    name: &str,
    table: &'static str,
    deps: ResolvedDependencies,
) -> Result<ServiceInstance> {
    let database = database_from(&deps)?;
    let repository = TableRepository::connect(name, table, database).await?;
    Ok(repository_instance(Arc::new(repository)))
}

pub async fn create_product_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    let database = database_from(&deps)?;
    let repository =
        TableRepository::connect(services::PRODUCT_REPOSITORY, tables::PRODUCTS, database).await?;
    Ok(product_repository_instance(Arc::new(repository)))
}

pub async fn create_user_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::USER_REPOSITORY, tables::USERS, deps).await
}

pub async fn create_order_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::ORDER_REPOSITORY, tables::ORDERS, deps).await
}

pub async fn create_payment_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::PAYMENT_REPOSITORY, tables::PAYMENTS, deps).await
}

pub async fn create_payment_method_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::PAYMENT_METHOD_REPOSITORY, tables::PAYMENT_METHODS, deps).await
}

pub async fn create_occasion_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::OCCASION_REPOSITORY, tables::OCCASIONS, deps).await
}

pub async fn create_settings_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::SETTINGS_REPOSITORY, tables::SETTINGS, deps).await
}

pub async fn create_product_image_repository(deps: ResolvedDependencies) -> Result<ServiceInstance> {
    create_table_repository(services::PRODUCT_IMAGE_REPOSITORY, tables::PRODUCT_IMAGES, deps).await
}

/// Degraded stand-in for the named repository
pub fn stub_instance(name: &str) -> ServiceInstance {
    if name == services::PRODUCT_REPOSITORY {
        product_repository_instance(Arc::new(StubProductRepository::new()))
    } else {
        repository_instance(Arc::new(StubRepository::new(name)))
    }
}
