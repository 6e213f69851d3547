// File: backend/src/repositories/stub.rs
use super::{Filters, ProductRepository, Repository};
use crate::constants::services;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Degraded repository: answers every call with an empty result and a warning
#[derive(Debug, Clone)]
pub struct StubRepository {
    name: String,
}

impl StubRepository {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn degraded(&self, method: &str) {
        warn!("{}.{} served by stub (database unavailable)", self.name, method);
    }
}

#[async_trait]
impl Repository for StubRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_all(&self, _filters: &Filters, _limit: Option<u32>) -> Result<Vec<Value>> {
        self.degraded("find_all");
        Ok(Vec::new())
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<Value>> {
        self.degraded("find_by_id");
        Ok(None)
    }

    async fn create(&self, _data: Value) -> Result<Value> {
        self.degraded("create");
        Ok(json!({ "id": Utc::now().timestamp_millis() }))
    }

    async fn update(&self, _id: i64, _data: Value) -> Result<Value> {
        self.degraded("update");
        Ok(json!({}))
    }

    async fn delete(&self, _id: i64) -> Result<Value> {
        self.degraded("delete");
        Ok(json!({ "active": false }))
    }

    async fn count(&self, _filters: &Filters) -> Result<i64> {
        self.degraded("count");
        Ok(0)
    }
}

/// Stub for the product repository, including the product-only queries
#[derive(Debug, Clone)]
pub struct StubProductRepository {
    inner: StubRepository,
}

impl StubProductRepository {
    pub fn new() -> Self {
        Self {
            inner: StubRepository::new(services::PRODUCT_REPOSITORY),
        }
    }
}

impl Default for StubProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for StubProductRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find_all(&self, filters: &Filters, limit: Option<u32>) -> Result<Vec<Value>> {
        self.inner.find_all(filters, limit).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Value>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, data: Value) -> Result<Value> {
        self.inner.create(data).await
    }

    async fn update(&self, id: i64, data: Value) -> Result<Value> {
        self.inner.update(id, data).await
    }

    async fn delete(&self, id: i64) -> Result<Value> {
        self.inner.delete(id).await
    }

    async fn count(&self, filters: &Filters) -> Result<i64> {
        self.inner.count(filters).await
    }
}

#[async_trait]
impl ProductRepository for StubProductRepository {
    async fn find_featured(&self, _limit: Option<u32>) -> Result<Vec<Value>> {
        self.inner.degraded("find_featured");
        Ok(Vec::new())
    }

    async fn find_by_sku(&self, _sku: &str) -> Result<Option<Value>> {
        self.inner.degraded("find_by_sku");
        Ok(None)
    }

    async fn update_stock(&self, _id: i64, _stock: i64) -> Result<Value> {
        self.inner.degraded("update_stock");
        Ok(json!({}))
    }

    async fn decrement_stock(&self, _id: i64, _quantity: i64) -> Result<Value> {
        self.inner.degraded("decrement_stock");
        Ok(json!({}))
    }

    fn as_repository(self: Arc<Self>) -> Arc<dyn Repository> {
        self
    }
}
