//! Database layer for the FloresYa backend.
//!
//! Every business table is a document table: the record body lives in a
//! JSON `data` column next to `id`, `active`, `created_at` and
//! `updated_at`. The module is organized into submodules:
//! - `query` - chainable read queries (`from(..).select(..).eq(..)`)
//! - `rpc` - named server-side functions

mod query;
mod rpc;

pub use query::{SqlValue, TableQuery};

use crate::constants::tables;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("=== Starting database initialization ===");
        info!("Database path: {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("FAILED to create parent directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        info!("Connecting to database with URL: {}", database_url);

        let pool = match SqlitePool::connect(&database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("FAILED to connect to database: {}", e);
                error!("   Connection URL: {}", database_url);
                return Err(e.into());
            }
        };

        let database = Self { pool };
        database.initialize_tables().await?;
        database.test_database().await?;

        info!("=== Database initialization completed successfully ===");
        Ok(database)
    }

    /// Private in-memory database, used by tests and local tooling
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        for table in tables::ALL {
            let create_sql = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    data TEXT NOT NULL DEFAULT '{{}}',
                    active BOOLEAN NOT NULL DEFAULT 1,
                    created_at DATETIME NOT NULL,
                    updated_at DATETIME NOT NULL
                )
                "#,
                table
            );

            if let Err(e) = sqlx::query(&create_sql).execute(&self.pool).await {
                error!("FAILED to create {} table: {}", table, e);
                return Err(e.into());
            }
            debug!("{} table ready", table);
        }

        info!("{} document tables initialized", tables::ALL.len());
        Ok(())
    }

    async fn test_database(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Database connectivity test failed: {}", e))?;
        Ok(())
    }

    /// Start a read query on `table`
    pub fn from(&self, table: &str) -> Result<TableQuery<'_>> {
        Ok(TableQuery::new(self, validate_table(table)?))
    }

    /// Insert a document and return the stored row
    pub async fn insert(&self, table: &str, data: Value) -> Result<Value> {
        let table = validate_table(table)?;
        let document = document_body(data)?;
        let now = Utc::now();

        let result = sqlx::query(&format!(
            "INSERT INTO {} (data, active, created_at, updated_at) VALUES (?, 1, ?, ?)",
            table
        ))
        .bind(Value::Object(document).to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Insert into {} failed: {}", table, e))?;

        let id = result.last_insert_rowid();
        self.find_row(table, id)
            .await?
            .ok_or_else(|| anyhow!("Inserted row {} vanished from {}", id, table))
    }

    /// Merge `patch` into the stored document. `None` when the row does not exist.
    pub async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Option<Value>> {
        let table = validate_table(table)?;
        let patch = document_body(patch)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET data = json_patch(data, ?), updated_at = ? WHERE id = ?",
            table
        ))
        .bind(Value::Object(patch).to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Update of {} #{} failed: {}", table, id, e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_row(table, id).await
    }

    pub async fn set_active(&self, table: &str, id: i64, active: bool) -> Result<Option<Value>> {
        let table = validate_table(table)?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET active = ?, updated_at = ? WHERE id = ?",
            table
        ))
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to set active={} on {} #{}: {}", active, table, id, e))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_row(table, id).await
    }

    /// Atomically subtract `amount` from a numeric document field. Returns
    /// `false` when the row is missing or the field would go negative.
    pub async fn decrement(&self, table: &str, id: i64, field: &str, amount: i64) -> Result<bool> {
        let table = validate_table(table)?;
        validate_field(field)?;

        let current = format!("COALESCE(json_extract(data, '$.{}'), 0)", field);
        let result = sqlx::query(&format!(
            "UPDATE {table} SET data = json_set(data, '$.{field}', {current} - ?), updated_at = ? \
             WHERE id = ? AND {current} >= ?",
        ))
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to decrement {}.{} on #{}: {}", table, field, id, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_row(&self, table: &'static str, id: i64) -> Result<Option<Value>> {
        TableQuery::new(self, table).eq("id", id).maybe_single().await
    }
}

pub(crate) fn validate_table(table: &str) -> Result<&'static str> {
    tables::ALL
        .iter()
        .copied()
        .find(|known| *known == table)
        .ok_or_else(|| anyhow!("Unknown table: {}", table))
}

pub(crate) fn validate_field(field: &str) -> Result<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid field name: {:?}", field))
    }
}

/// Strip row-level columns from an incoming document
fn document_body(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(mut fields) => {
            for column in ["id", "active", "created_at", "updated_at"] {
                fields.remove(column);
            }
            Ok(fields)
        }
        other => Err(anyhow!("Expected a JSON object, got {}", other)),
    }
}

fn row_to_json(row: &SqliteRow) -> Result<Value> {
    let id: i64 = row.try_get("id")?;
    let data: String = row.try_get("data")?;
    let active: bool = row.try_get("active")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let mut document = match serde_json::from_str::<Value>(&data)? {
        Value::Object(fields) => fields,
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), other);
            fields
        }
    };
    document.insert("id".to_string(), Value::from(id));
    document.insert("active".to_string(), Value::from(active));
    document.insert("created_at".to_string(), Value::from(created_at.to_rfc3339()));
    document.insert("updated_at".to_string(), Value::from(updated_at.to_rfc3339()));

    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_table() {
        assert_eq!(validate_table("products").unwrap(), "products");
        assert!(validate_table("sqlite_master").is_err());
    }

    #[test]
    fn test_document_body_strips_row_columns() {
        let body = document_body(json!({"id": 9, "name": "Rosas", "active": false})).unwrap();
        assert_eq!(Value::Object(body), json!({"name": "Rosas"}));
        assert!(document_body(json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn test_insert_update_and_decrement() {
        let db = Database::in_memory().await.unwrap();

        let row = db
            .insert("products", json!({"name": "Tulipanes", "stock": 5}))
            .await
            .unwrap();
        let id = row["id"].as_i64().unwrap();
        assert_eq!(row["active"], json!(true));

        let updated = db
            .update("products", id, json!({"price": 12.5}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("Tulipanes"));
        assert_eq!(updated["price"], json!(12.5));

        assert!(db.decrement("products", id, "stock", 3).await.unwrap());
        assert!(!db.decrement("products", id, "stock", 3).await.unwrap());
        let row = db.from("products").unwrap().eq("id", id).maybe_single().await.unwrap().unwrap();
        assert_eq!(row["stock"], json!(2));

        assert!(db.update("products", 999, json!({"x": 1})).await.unwrap().is_none());
    }
}
