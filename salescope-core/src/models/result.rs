use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Semantic column types surfaced to the render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Date,
    Timestamp,
    Boolean,
}

/// A single cell of a query result. Also used as the scalar parameter type
/// for bound report parameters.
///
/// Untagged serde: variant order matters for deserialization — the more
/// specific string shapes (timestamp, date) must be tried before `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// A tabular result: named, typed columns plus rows in result order.
/// Immutable once returned by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_matches_rows() {
        let result = QueryResult::new(
            vec![Column {
                name: "total".to_string(),
                column_type: ColumnType::Integer,
            }],
            vec![vec![CellValue::Integer(50000)]],
        );
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_cell_value_json_shapes() {
        let json = serde_json::to_string(&CellValue::Integer(42)).unwrap();
        assert_eq!(json, "42");

        let json = serde_json::to_string(&CellValue::Null).unwrap();
        assert_eq!(json, "null");

        let json =
            serde_json::to_string(&CellValue::Date("2024-01-31".parse().unwrap())).unwrap();
        assert_eq!(json, "\"2024-01-31\"");

        let json = serde_json::to_string(&CellValue::Text("West".to_string())).unwrap();
        assert_eq!(json, "\"West\"");
    }
}
