//! Test database utilities for in-memory SQLite testing

use floresya_backend::database::Database;
use serde_json::Value;
use std::sync::Arc;

pub async fn test_database() -> Arc<Database> {
    Arc::new(
        Database::in_memory()
            .await
            .expect("in-memory database should open"),
    )
}

/// Database whose pool is closed, so every query fails
pub async fn broken_database() -> Arc<Database> {
    let database = test_database().await;
    database.pool().close().await;
    database
}

pub async fn seed(database: &Database, table: &str, rows: Vec<Value>) -> Vec<i64> {
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        let stored = database.insert(table, row).await.expect("seed insert");
        ids.push(stored["id"].as_i64().expect("seeded row has an id"));
    }
    ids
}
