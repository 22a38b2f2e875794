//! Tabular batches carried between the extractors and the store
//!
//! A [`RecordBatch`] is a plain record-sequence value: a column list plus
//! row vectors of [`DbValue`] cells. It replaces a dataframe dependency;
//! the store adapter consumes it directly for parameterised bulk inserts.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// One cell of a tabular batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            DbValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            DbValue::Real(v) => Some(*v),
            DbValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DbValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => f.write_str(""),
            DbValue::Integer(v) => write!(f, "{v}"),
            DbValue::Real(v) => write!(f, "{v}"),
            DbValue::Text(v) => f.write_str(v),
            DbValue::Bool(v) => write!(f, "{v}"),
            DbValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            DbValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Bool(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for DbValue {
    fn from(v: NaiveDate) -> Self {
        DbValue::Date(v)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(v: NaiveDateTime) -> Self {
        DbValue::DateTime(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DbValue::Null, Into::into)
    }
}

/// Column-named row set: the unit of transfer into `insert_rows` and out
/// of `execute` for result-set queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<DbValue>>,
}

impl RecordBatch {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append one row. The cell count must match the column count.
    pub fn push_row(&mut self, row: Vec<DbValue>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<DbValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&DbValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_roundtrip() {
        let mut batch = RecordBatch::new(["a", "b"]);
        batch.push_row(vec![DbValue::Integer(1), DbValue::Text("x".into())]);
        batch.push_row(vec![DbValue::Null, DbValue::Bool(true)]);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.cell(0, "a"), Some(&DbValue::Integer(1)));
        assert_eq!(batch.cell(1, "b"), Some(&DbValue::Bool(true)));
        assert!(batch.cell(1, "a").unwrap().is_null());
        assert_eq!(batch.cell(0, "missing"), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(DbValue::from(Some(1.5_f64)), DbValue::Real(1.5));
        assert_eq!(DbValue::from(None::<f64>), DbValue::Null);
    }

    #[test]
    fn test_display_formats_temporal_cells() {
        let d = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        assert_eq!(DbValue::Date(d).to_string(), "2025-05-10");
    }
}
