//! Query execution against the analytical store — the sole I/O boundary of
//! the Ask pipeline.
//!
//! SQL is treated as opaque text with no client-side validation: the
//! surface is single-tenant and internal, and the generated statement runs
//! with whatever privileges the pool's role has. Canned report parameters
//! are always bound, never formatted into the statement text.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column as _, PgPool, Row, TypeInfo};
use thiserror::Error;

use crate::models::{CellValue, Column, ColumnType, QueryResult};

/// Execution failures — malformed SQL, permission errors, timeouts.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Unsupported type {type_name} in column {column}")]
    UnsupportedType { column: String, type_name: String },
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a statement with no bound parameters (ad hoc generated queries).
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        self.execute_with_params(sql, &[]).await
    }

    /// Run a statement with positional bound parameters ($1, $2, ...).
    async fn execute_with_params(
        &self,
        sql: &str,
        params: &[CellValue],
    ) -> Result<QueryResult, ExecutionError>;
}

/// Postgres-backed executor over the shared connection pool.
pub struct PgQueryExecutor {
    pool: PgPool,
}

impl PgQueryExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute_with_params(
        &self,
        sql: &str,
        params: &[CellValue],
    ) -> Result<QueryResult, ExecutionError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                CellValue::Null => query.bind(Option::<String>::None),
                CellValue::Boolean(b) => query.bind(*b),
                CellValue::Integer(i) => query.bind(*i),
                CellValue::Decimal(d) => query.bind(*d),
                CellValue::Timestamp(t) => query.bind(*t),
                CellValue::Date(d) => query.bind(*d),
                CellValue::Text(s) => query.bind(s.clone()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows_to_result(&rows)
    }
}

fn rows_to_result(rows: &[PgRow]) -> Result<QueryResult, ExecutionError> {
    // Column metadata comes from the first row; a zero-row result renders
    // as an empty table.
    let first = match rows.first() {
        Some(row) => row,
        None => return Ok(QueryResult::empty()),
    };

    let columns: Vec<Column> = first
        .columns()
        .iter()
        .map(|c| Column {
            name: c.name().to_string(),
            column_type: column_type_of(c.type_info().name()),
        })
        .collect();

    let mut out_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(columns.len());
        for (idx, col) in row.columns().iter().enumerate() {
            cells.push(decode_cell(row, idx, col)?);
        }
        out_rows.push(cells);
    }

    Ok(QueryResult::new(columns, out_rows))
}

fn column_type_of(type_name: &str) -> ColumnType {
    match type_name {
        "INT2" | "INT4" | "INT8" => ColumnType::Integer,
        "NUMERIC" | "FLOAT4" | "FLOAT8" => ColumnType::Decimal,
        "DATE" => ColumnType::Date,
        "TIMESTAMP" | "TIMESTAMPTZ" => ColumnType::Timestamp,
        "BOOL" => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

fn decode_cell(row: &PgRow, idx: usize, col: &PgColumn) -> Result<CellValue, ExecutionError> {
    let type_name = col.type_info().name();

    let cell = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| CellValue::Integer(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| CellValue::Integer(i64::from(v))),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(CellValue::Integer),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)?
            .map(CellValue::Decimal),
        // Non-finite floats have no decimal form and surface as NULL
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .and_then(|v| Decimal::from_f64_retain(f64::from(v)))
            .map(CellValue::Decimal),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .and_then(Decimal::from_f64_retain)
            .map(CellValue::Decimal),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.map(CellValue::Date),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(CellValue::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|v| CellValue::Timestamp(v.and_utc())),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(CellValue::Boolean),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)?
            .map(CellValue::Text),
        _ => match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(CellValue::Text),
            Err(_) => {
                return Err(ExecutionError::UnsupportedType {
                    column: col.name().to_string(),
                    type_name: type_name.to_string(),
                })
            }
        },
    };

    Ok(cell.unwrap_or(CellValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(column_type_of("INT8"), ColumnType::Integer);
        assert_eq!(column_type_of("NUMERIC"), ColumnType::Decimal);
        assert_eq!(column_type_of("FLOAT8"), ColumnType::Decimal);
        assert_eq!(column_type_of("DATE"), ColumnType::Date);
        assert_eq!(column_type_of("TIMESTAMPTZ"), ColumnType::Timestamp);
        assert_eq!(column_type_of("BOOL"), ColumnType::Boolean);
        assert_eq!(column_type_of("VARCHAR"), ColumnType::Text);
        // Unknown types render as text until proven otherwise
        assert_eq!(column_type_of("JSONB"), ColumnType::Text);
    }
}
