//! Query execution against PostgreSQL for the statement shapes built in `sql`.

use crate::error::AppError;
use crate::schema::Catalog;
use crate::sql::{
    delete_by_id, insert_or_ignore, select_grouped, select_joined, select_tree, update_by_id, GroupedRead,
    JoinedRead, QueryBuf, ReadQuery,
};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes one statement per call. Holds the shared pool and the catalog every statement
/// is built against; cheap to clone.
#[derive(Clone)]
pub struct CrudService {
    pool: PgPool,
    catalog: Arc<Catalog>,
}

impl CrudService {
    pub fn new(pool: PgPool, catalog: Arc<Catalog>) -> Self {
        CrudService { pool, catalog }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert one row unless it collides with a unique constraint. Returns the primary key
    /// of the inserted row, or None when the insert was skipped.
    pub async fn create_or_ignore(
        &self,
        entity: &str,
        fields: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = insert_or_ignore(&self.catalog, entity, fields)?;
        let row = self.fetch_optional(&q).await?;
        if row.is_none() {
            tracing::debug!(entity, "insert skipped on conflict");
        }
        Ok(row)
    }

    /// Filtered, sorted, paginated read with nested relations as JSON.
    pub async fn read(&self, query: &ReadQuery) -> Result<Vec<Value>, AppError> {
        let q = select_tree(&self.catalog, query)?;
        self.fetch_all(&q).await
    }

    pub async fn read_joined(&self, query: &JoinedRead) -> Result<Vec<Value>, AppError> {
        let q = select_joined(&self.catalog, query)?;
        self.fetch_all(&q).await
    }

    pub async fn read_grouped(&self, query: &GroupedRead) -> Result<Vec<Value>, AppError> {
        let q = select_grouped(&self.catalog, query)?;
        self.fetch_all(&q).await
    }

    /// Update one row by id. Empty when the id matches nothing.
    pub async fn update_by_id(
        &self,
        entity: &str,
        id: &Value,
        changes: &HashMap<String, Value>,
        returning: Option<&[&str]>,
    ) -> Result<Vec<Value>, AppError> {
        let q = update_by_id(&self.catalog, entity, id, changes, returning)?;
        self.fetch_all(&q).await
    }

    /// Delete one row by id. Empty when the id matches nothing.
    pub async fn delete_by_id(
        &self,
        entity: &str,
        id: &Value,
        returning: Option<&[&str]>,
    ) -> Result<Vec<Value>, AppError> {
        let q = delete_by_id(&self.catalog, entity, id, returning)?;
        self.fetch_all(&q).await
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        let rows = bind_all(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        let row = bind_all(q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

fn bind_all(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell by trying the column types the catalog can produce, in turn.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(timestamp_text(&d));
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// Text form of a `timestamp`, identical to what Postgres emits inside `row_to_json`, so a
/// column reads the same at the top level and in a nested relation: microsecond precision
/// with trailing zeros dropped.
fn timestamp_text(d: &chrono::NaiveDateTime) -> String {
    let full = d.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    full.trim_end_matches('0').trim_end_matches('.').to_string()
}
