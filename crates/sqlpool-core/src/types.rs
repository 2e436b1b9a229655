//! Values and result sets passed through a pooled connection
//!
//! Only what the pool and its drivers exchange: SQLite's storage classes plus
//! booleans for parameters.

use std::sync::Arc;

/// A single parameter or column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Bound as an integer `0`/`1` by drivers without a boolean type
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

/// One row of a result set
///
/// Column names are shared by every row of the same result.
#[derive(Debug, Clone)]
pub struct Row {
    pub values: Vec<Value>,
    columns: Arc<[String]>,
}

impl Row {
    pub fn new(columns: impl Into<Arc<[String]>>, values: Vec<Value>) -> Self {
        Self {
            values,
            columns: columns.into(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// First column with this name wins
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index)
    }
}

/// Name and declared type of a result column
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    /// As declared by the database, e.g. `INTEGER` or `DYNAMIC` for expressions
    pub data_type: String,
    pub ordinal: usize,
}

/// Rows returned by [`Connection::query`](crate::Connection::query)
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Outcome of [`Connection::execute`](crate::Connection::execute)
#[derive(Debug, Clone)]
pub struct StatementResult {
    pub affected_rows: u64,
}
