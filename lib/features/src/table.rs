//! Feature table
//!
//! Rows are JSON objects: numeric feature fields next to opaque metadata
//! fields such as `name` or `artist`. Row position is item identity.

use serde_json::Value;
use tracklist_core::{Error, Result};

/// Tabular input to the reducer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<Value>,
}

impl FeatureTable {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    /// Parse a JSON array of objects
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(rows) => Ok(Self::new(rows)),
            _ => Err(Error::Data {
                row: 0,
                column: String::new(),
                reason: "feature table must be a JSON array of objects".to_string(),
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Value> {
        self.rows.get(idx)
    }

    /// Value of one numeric field, or a data error naming the row and column
    pub fn numeric(&self, row: usize, column: &str) -> Result<f64> {
        let data_error = |reason: &str| Error::Data {
            row,
            column: column.to_string(),
            reason: reason.to_string(),
        };

        let record = self.rows.get(row).ok_or_else(|| data_error("row out of range"))?;
        if !record.is_object() {
            return Err(data_error("row is not an object"));
        }
        match record.get(column) {
            None | Some(Value::Null) => Err(data_error("missing value")),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(x) if x.is_finite() => Ok(x),
                _ => Err(data_error("number is not finite")),
            },
            Some(other) => Err(data_error(&format!("expected a number, found {}", kind(other)))),
        }
    }

    /// Row-major `len x columns.len()` matrix of the requested columns
    pub fn numeric_matrix(&self, columns: &[String]) -> Result<Vec<f64>> {
        let mut matrix = Vec::with_capacity(self.rows.len() * columns.len());
        for row in 0..self.rows.len() {
            for column in columns {
                matrix.push(self.numeric(row, column)?);
            }
        }
        Ok(matrix)
    }

    /// Numeric fields of the first row that are not descriptive, sorted by name
    pub fn numeric_columns_except(&self, descriptive: &[&str]) -> Vec<String> {
        let Some(Value::Object(first)) = self.rows.first() else {
            return Vec::new();
        };
        let mut names: Vec<String> = first
            .iter()
            .filter(|(name, value)| value.is_number() && !descriptive.contains(&name.as_str()))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Display value of a metadata field
    pub fn label(&self, row: usize, field: &str) -> Option<String> {
        match self.rows.get(row)?.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl From<Vec<Value>> for FeatureTable {
    fn from(rows: Vec<Value>) -> Self {
        Self::new(rows)
    }
}
