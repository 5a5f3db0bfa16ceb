//! Tabular values passed between steps
//!
//! A [`Table`] is an ordered set of named columns that all share one row
//! count. Tables are never mutated once built: every transform helper here
//! returns a new table.

use serde::Serialize;
use thiserror::Error;

use crate::value::{Record, Value};

/// Structural violations when building a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("row index {index} out of bounds for table with {row_count} rows")]
    RowOutOfBounds { index: usize, row_count: usize },
}

/// A single named column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Ordered, named-column table with a consistent row count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table {
    /// A table with no columns and no rows
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Build a table from columns, checking that every column has the same length
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            row_count,
        };
        for column in columns {
            if table.has_column(&column.name) {
                return Err(TableError::DuplicateColumn(column.name));
            }
            check_length(&column.name, row_count, column.values.len())?;
            table.columns.push(column);
        }
        Ok(table)
    }

    /// Build a table from `(name, values)` pairs
    pub fn from_columns<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    /// A one-column table
    pub fn single_column(name: impl Into<String>, values: Vec<Value>) -> Self {
        let row_count = values.len();
        Self {
            columns: vec![Column::new(name, values)],
            row_count,
        }
    }

    /// One row per record. Columns are the union of keys in first-seen
    /// order; a record missing a key gets null in that column. Nested
    /// records are flattened into `parent.child` columns.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let records: Vec<&Record> = records.into_iter().collect();
        let mut columns: Vec<Column> = Vec::new();
        for (row, record) in records.iter().enumerate() {
            let mut fields = Vec::with_capacity(record.len());
            flatten_record(None, record, &mut fields);
            for (key, value) in fields {
                let idx = match columns.iter().position(|c| c.name == key) {
                    Some(idx) => idx,
                    None => {
                        columns.push(Column::new(key, vec![Value::Null; records.len()]));
                        columns.len() - 1
                    }
                };
                columns[idx].values[row] = value;
            }
        }
        Self {
            columns,
            row_count: records.len(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column in row order
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)?.get(row)
    }

    /// Row `index` as a record keyed by column name
    pub fn row(&self, index: usize) -> Option<Record> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[index].clone()))
                .collect(),
        )
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.row_count).filter_map(|i| self.row(i)).collect()
    }

    /* ===================== Derived Tables ===================== */

    /// The first `n` rows
    pub fn head(&self, n: usize) -> Table {
        self.slice(0, n)
    }

    /// Rows `offset..offset + limit`, clamped to the table bounds
    pub fn slice(&self, offset: usize, limit: usize) -> Table {
        let start = offset.min(self.row_count);
        let end = offset.saturating_add(limit).min(self.row_count);
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[start..end].to_vec()))
                .collect(),
            row_count: end - start,
        }
    }

    /// A table built from the given row indices, in the given order.
    /// Indices may repeat, which is how rows are replicated for an explode.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table, TableError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.row_count) {
            return Err(TableError::RowOutOfBounds {
                index,
                row_count: self.row_count,
            });
        }
        Ok(Table {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        indices.iter().map(|&i| c.values[i].clone()).collect(),
                    )
                })
                .collect(),
            row_count: indices.len(),
        })
    }

    /// Keep the rows for which `keep` returns true
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize, &Table) -> bool,
    {
        let indices: Vec<usize> = (0..self.row_count).filter(|&i| keep(i, self)).collect();
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        indices.iter().map(|&i| c.values[i].clone()).collect(),
                    )
                })
                .collect(),
            row_count: indices.len(),
        }
    }

    /// A copy with `name` set to `values`. An existing column of the same
    /// name is replaced in place; otherwise the column is appended.
    pub fn with_column(&self, name: impl Into<String>, values: Vec<Value>) -> Result<Table, TableError> {
        let name = name.into();
        let expected = if self.columns.is_empty() && self.row_count == 0 {
            values.len()
        } else {
            self.row_count
        };
        check_length(&name, expected, values.len())?;

        let mut table = self.clone();
        table.row_count = expected;
        match table.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => table.columns.push(Column::new(name, values)),
        }
        Ok(table)
    }

    /// A copy without the named column
    pub fn without_column(&self, name: &str) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
            row_count: self.row_count,
        }
    }
}

fn check_length(column: &str, expected: usize, found: usize) -> Result<(), TableError> {
    if expected != found {
        return Err(TableError::RaggedColumn {
            column: column.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Depth-first `(dotted name, leaf value)` pairs. Empty nested records stay
/// as a single cell.
fn flatten_record(prefix: Option<&str>, record: &Record, out: &mut Vec<(String, Value)>) {
    for (key, value) in record {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Record(nested) if !nested.is_empty() => {
                flatten_record(Some(&name), nested, out)
            }
            _ => out.push((name, value.clone())),
        }
    }
}
