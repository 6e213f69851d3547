// File: backend/src/repositories/table.rs
use super::{Filters, ProductRepository, Repository};
use crate::database::Database;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Repository over one document table
pub struct TableRepository {
    name: String,
    table: &'static str,
    database: Arc<Database>,
}

impl TableRepository {
    pub fn new(name: &str, table: &'static str, database: Arc<Database>) -> Self {
        Self {
            name: name.to_string(),
            table,
            database,
        }
    }

    /// Build the repository and make sure its table answers
    pub async fn connect(name: &str, table: &'static str, database: Arc<Database>) -> Result<Self> {
        let repository = Self::new(name, table, database);
        let rows = repository
            .database
            .from(table)?
            .count()
            .await
            .map_err(|e| anyhow!("{} cannot reach table {}: {}", name, table, e))?;
        debug!("{} connected to {} ({} rows)", name, table, rows);
        Ok(repository)
    }
}

#[async_trait]
impl Repository for TableRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_all(&self, filters: &Filters, limit: Option<u32>) -> Result<Vec<Value>> {
        let mut query = self.database.from(self.table)?.filter_map(filters);
        if !filters.contains_key("active") {
            query = query.eq("active", true);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query.fetch().await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Value>> {
        self.database
            .from(self.table)?
            .eq("id", id)
            .maybe_single()
            .await
    }

    async fn create(&self, data: Value) -> Result<Value> {
        let row = self.database.insert(self.table, data).await?;
        info!("{} created record {}", self.name, row["id"]);
        Ok(row)
    }

    async fn update(&self, id: i64, data: Value) -> Result<Value> {
        self.database
            .update(self.table, id, data)
            .await?
            .ok_or_else(|| anyhow!("{} record {} not found", self.name, id))
    }

    async fn delete(&self, id: i64) -> Result<Value> {
        let row = self
            .database
            .set_active(self.table, id, false)
            .await?
            .ok_or_else(|| anyhow!("{} record {} not found", self.name, id))?;
        info!("{} deactivated record {}", self.name, id);
        Ok(row)
    }

    async fn count(&self, filters: &Filters) -> Result<i64> {
        self.database
            .from(self.table)?
            .filter_map(filters)
            .count()
            .await
    }
}

#[async_trait]
impl ProductRepository for TableRepository {
    async fn find_featured(&self, limit: Option<u32>) -> Result<Vec<Value>> {
        let mut query = self
            .database
            .from(self.table)?
            .eq("featured", true)
            .eq("active", true);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query.fetch().await
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Value>> {
        self.database
            .from(self.table)?
            .eq("sku", sku)
            .maybe_single()
            .await
    }

    async fn update_stock(&self, id: i64, stock: i64) -> Result<Value> {
        if stock < 0 {
            return Err(anyhow!("Stock cannot be negative (got {})", stock));
        }
        self.update(id, json!({ "stock": stock })).await
    }

    async fn decrement_stock(&self, id: i64, quantity: i64) -> Result<Value> {
        if quantity <= 0 {
            return Err(anyhow!("Quantity must be positive (got {})", quantity));
        }

        if !self
            .database
            .decrement(self.table, id, "stock", quantity)
            .await?
        {
            warn!("{} could not take {} units from product {}", self.name, quantity, id);
            return Err(anyhow!(
                "Insufficient stock for product {} (requested {})",
                id,
                quantity
            ));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("{} record {} not found", self.name, id))
    }

    fn as_repository(self: Arc<Self>) -> Arc<dyn Repository> {
        self
    }
}
