//! Tabular listings of reference data.
//!
//! A [`Listing`] is an ordered set of flat records, one per element of the API array,
//! with the union of their fields as columns. Listings are rebuilt on every call and
//! never written back.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// One row: field name to value.
pub type Record = Map<String, Value>;

/// Ordered collection of uniform records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Listing {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Listing {
    /// Build a listing from API array elements. Every element must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] naming the first element that is not an object.
    pub fn from_values(values: Vec<Value>) -> Result<Self> {
        let records = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                Value::Object(record) => Ok(record),
                other => Err(Error::ParseError(format!(
                    "listing element {index} is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_records(records))
    }

    /// Build a listing from records. Columns follow the first record that carries them,
    /// sorted by name within a record.
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.clone());
                }
            }
        }

        Self { columns, records }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All records, in order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterate over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Values of one column, `None` where a record lacks the field.
    #[must_use]
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.records.iter().map(|record| record.get(name)).collect()
    }

    /// First record whose `field` equals `value`.
    #[must_use]
    pub fn find_by(&self, field: &str, value: &Value) -> Option<&Record> {
        self.records
            .iter()
            .find(|record| record.get(field) == Some(value))
    }

    /// Sort ascending by `field`, in place.
    ///
    /// The sort is stable. Numbers compare numerically and strings lexically; records
    /// missing the field (or holding null) go last.
    pub fn sort_by(&mut self, field: &str) {
        self.records
            .sort_by(|a, b| compare_values(a.get(field), b.get(field)));
    }

    /// Sorted copy, see [`Listing::sort_by`].
    #[must_use]
    pub fn sorted_by(mut self, field: &str) -> Self {
        self.sort_by(field);
        self
    }

    /// Consume the listing, keeping its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Listing {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for Listing {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => type_rank(x).cmp(&type_rank(y)),
    }
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Aligned text table: a header row, then one row per record.
impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Vec<String>> = self
            .records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .map(|column| render_cell(record.get(column)))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                rows.iter()
                    .map(|row| row[index].chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[&str]| -> fmt::Result {
            let line = cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(f, "{}", line.trim_end())
        };

        let header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        write_row(f, &header)?;
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            write_row(f, &cells)?;
        }
        Ok(())
    }
}
