// File: backend/src/database/query.rs
use super::{row_to_json, validate_field, Database};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

/// Columns stored outside the JSON document
const ROW_COLUMNS: [&str; 4] = ["id", "active", "created_at", "updated_at"];

/// Filter value bound into a query
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }
}

/// Chainable read query over one document table:
/// `db.from("products")?.select("id,name").eq("featured", true).limit(5).fetch()`
pub struct TableQuery<'a> {
    database: &'a Database,
    table: &'static str,
    columns: Option<Vec<String>>,
    filters: Vec<(String, SqlValue)>,
    limit: Option<u32>,
}

impl<'a> TableQuery<'a> {
    pub(super) fn new(database: &'a Database, table: &'static str) -> Self {
        Self {
            database,
            table,
            columns: None,
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Comma-separated projection; `*` keeps every field
    pub fn select(mut self, columns: &str) -> Self {
        let columns: Vec<String> = columns
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self.columns = if columns.is_empty() || columns.iter().any(|c| c == "*") {
            None
        } else {
            Some(columns)
        };
        self
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.filters.push((field.to_string(), SqlValue::from(&value)));
        self
    }

    /// Add every entry of a JSON object as an equality filter
    pub fn filter_map(mut self, filters: &Map<String, Value>) -> Self {
        for (field, value) in filters {
            self.filters.push((field.clone(), SqlValue::from(value)));
        }
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub async fn fetch(self) -> Result<Vec<Value>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, data, active, created_at, updated_at FROM ");
        query.push(self.table);
        self.push_filters(&mut query)?;

        query.push(" ORDER BY id ASC");

        if let Some(limit) = self.limit {
            query.push(" LIMIT ");
            query.push_bind(i64::from(limit));
        }

        let rows = query
            .build()
            .fetch_all(self.database.pool())
            .await
            .map_err(|e| anyhow!("Query on {} failed: {}", self.table, e))?;

        rows.iter()
            .map(|row| row_to_json(row).map(|doc| self.project(doc)))
            .collect()
    }

    pub async fn maybe_single(self) -> Result<Option<Value>> {
        let mut rows = self.limit(1).fetch().await?;
        Ok(rows.pop())
    }

    pub async fn count(self) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ");
        query.push(self.table);
        self.push_filters(&mut query)?;

        query
            .build_query_scalar::<i64>()
            .fetch_one(self.database.pool())
            .await
            .map_err(|e| anyhow!("Count on {} failed: {}", self.table, e))
    }

    fn push_filters(&self, query: &mut QueryBuilder<'_, Sqlite>) -> Result<()> {
        for (index, (field, value)) in self.filters.iter().enumerate() {
            query.push(if index == 0 { " WHERE " } else { " AND " });
            query.push(column_expr(field)?);
            match value {
                SqlValue::Null => {
                    query.push(" IS NULL");
                }
                SqlValue::Text(text) => {
                    query.push(" = ");
                    query.push_bind(text.clone());
                }
                SqlValue::Integer(n) => {
                    query.push(" = ");
                    query.push_bind(*n);
                }
                SqlValue::Real(n) => {
                    query.push(" = ");
                    query.push_bind(*n);
                }
                SqlValue::Bool(b) => {
                    query.push(" = ");
                    query.push_bind(*b);
                }
            }
        }
        Ok(())
    }

    fn project(&self, document: Value) -> Value {
        match (&self.columns, document) {
            (Some(columns), Value::Object(mut fields)) => {
                let mut projected = Map::with_capacity(columns.len());
                for column in columns {
                    if let Some(value) = fields.remove(column) {
                        projected.insert(column.clone(), value);
                    }
                }
                Value::Object(projected)
            }
            (_, document) => document,
        }
    }
}

/// SQL expression for a field: a real column or a path into the JSON document
pub(super) fn column_expr(field: &str) -> Result<String> {
    validate_field(field)?;
    if ROW_COLUMNS.contains(&field) {
        Ok(field.to_string())
    } else {
        Ok(format!("json_extract(data, '$.{}')", field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_expr() {
        assert_eq!(column_expr("id").unwrap(), "id");
        assert_eq!(column_expr("sku").unwrap(), "json_extract(data, '$.sku')");
        assert!(column_expr("sku'; DROP TABLE users; --").is_err());
        assert!(column_expr("").is_err());
    }

    #[test]
    fn test_sql_value_from_json() {
        assert_eq!(SqlValue::from(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::from(&json!(42)), SqlValue::Integer(42));
        assert_eq!(SqlValue::from(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(SqlValue::from(&json!("rosa")), SqlValue::Text("rosa".to_string()));
        assert_eq!(SqlValue::from(&Value::Null), SqlValue::Null);
    }
}
