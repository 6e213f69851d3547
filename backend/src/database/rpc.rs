// File: backend/src/database/rpc.rs
use super::Database;
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

impl Database {
    /// Call a named server-side function
    ///
    /// - `ping`: `{ "ok": true, "at": <timestamp> }`
    /// - `count_rows`: `{ "table": <name> }` -> `{ "table", "count" }`,
    ///   optional `"active_only": true`
    pub async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        debug!("rpc {} {}", function, args);

        match function {
            "ping" => {
                sqlx::query("SELECT 1")
                    .execute(self.pool())
                    .await
                    .map_err(|e| anyhow!("ping failed: {}", e))?;
                Ok(json!({ "ok": true, "at": Utc::now().to_rfc3339() }))
            }
            "count_rows" => {
                let table = args
                    .get("table")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("count_rows requires a \"table\" argument"))?;
                let active_only = args
                    .get("active_only")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                let mut query = self.from(table)?;
                if active_only {
                    query = query.eq("active", true);
                }
                let count = query.count().await?;
                Ok(json!({ "table": table, "count": count }))
            }
            other => Err(anyhow!("Unknown rpc function: {}", other)),
        }
    }
}
