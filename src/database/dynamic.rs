//! Row access without compile-time schemas.
//!
//! Reads wrap their select in `row_to_json` so every row arrives as one JSON object that
//! serde can turn into an entity. Columns aliased as `relation.column` are folded into a
//! nested `relation` object.

use serde_json::{Map, Value};
use sqlx::{PgConnection, Row};

use crate::config::config;
use crate::database::manager::DatabaseError;
use crate::database::value::bind_value;
use crate::filter::types::SqlResult;

fn log_query(sql: &SqlResult) {
    if config().database.enable_query_logging {
        tracing::debug!(query = %sql.query, params = sql.params.len(), "Executing query");
    }
}

/// Run a `row_to_json` select and return one JSON object per row
pub async fn fetch_rows(conn: &mut PgConnection, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError> {
    log_query(sql);
    let mut q = sqlx::query(&sql.query);
    for p in &sql.params {
        q = bind_value(q, p);
    }
    let rows = q.fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
        .collect()
}

/// Run a statement and return the affected row count
pub async fn execute(conn: &mut PgConnection, sql: &SqlResult) -> Result<u64, DatabaseError> {
    log_query(sql);
    let mut q = sqlx::query(&sql.query);
    for p in &sql.params {
        q = bind_value(q, p);
    }
    let result = q.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Run an `INSERT ... RETURNING "id"` and return the id, if a row was written
pub async fn fetch_id(conn: &mut PgConnection, sql: &SqlResult) -> Result<Option<i64>, DatabaseError> {
    log_query(sql);
    let mut q = sqlx::query(&sql.query);
    for p in &sql.params {
        q = bind_value(q, p);
    }
    let Some(row) = q.fetch_optional(&mut *conn).await? else {
        return Ok(None);
    };
    let id = row
        .try_get::<i64, _>("id")
        .or_else(|_| row.try_get::<i32, _>("id").map(i64::from))?;
    Ok(Some(id))
}

pub async fn fetch_count(conn: &mut PgConnection, sql: &SqlResult) -> Result<i64, DatabaseError> {
    log_query(sql);
    let mut q = sqlx::query(&sql.query);
    for p in &sql.params {
        q = bind_value(q, p);
    }
    let row = q.fetch_one(&mut *conn).await?;
    Ok(row.try_get::<i64, _>("count")?)
}

/// Fold `relation.column` keys into nested objects. A relation whose columns are all null
/// (no related row behind a LEFT JOIN) becomes `null`.
pub fn nest_relations(row: Value) -> Value {
    let Value::Object(map) = row else {
        return row;
    };

    let mut base = Map::new();
    let mut nested: Map<String, Value> = Map::new();
    for (key, value) in map {
        match key.split_once('.') {
            Some((relation, column)) => {
                let slot = nested
                    .entry(relation.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(fields) = slot {
                    fields.insert(column.to_string(), value);
                }
            }
            None => {
                base.insert(key, value);
            }
        }
    }

    for (relation, fields) in nested {
        let empty = fields
            .as_object()
            .map(|f| f.values().all(Value::is_null))
            .unwrap_or(true);
        base.insert(relation, if empty { Value::Null } else { fields });
    }
    Value::Object(base)
}
