//! Ordered column-name to value mapping for one materialized result row.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::value::Value;

/// One row of a result set, in the driver's column order.
///
/// Inserting a column name that is already present replaces its value and
/// keeps the original position, so a result set with duplicate column names
/// keeps the last value seen for each name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Add or replace a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.values[idx])
    }

    pub fn get_index(&self, idx: usize) -> Option<(&str, &Value)> {
        Some((self.columns.get(idx)?.as_str(), self.values.get(idx)?))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Dynamically keyed object view of the row, keys in column order.
    pub fn to_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(column, value)| (column.to_string(), value.to_json()))
            .collect()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}
