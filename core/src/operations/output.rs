//! Result shapes a domain function may return

use crate::table::Table;
use crate::value::{Record, Value};

/// What a domain function produced
///
/// The adapter decides how each shape becomes table data, depending on the
/// operation type it is dispatching.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Table(Table),
    Scalar(Value),
    Record(Record),
    List(Vec<Value>),
    Records(Vec<Record>),
}

impl StepOutput {
    /// Classify a dynamic value by shape
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Record(record) => StepOutput::Record(record),
            Value::List(items) => StepOutput::List(items),
            other => StepOutput::Scalar(other),
        }
    }

    /// Normalize a source result into a table.
    ///
    /// Lists of records become one row per record; any other list becomes a
    /// single column named `column`. A lone scalar or record is one row. A
    /// `Scalar` holding a list or record is treated as that shape.
    pub fn into_table(self, column: &str) -> Table {
        match self {
            StepOutput::Table(table) => table,
            StepOutput::Records(records) => Table::from_records(&records),
            StepOutput::List(items) => match all_records(&items) {
                Some(records) => Table::from_records(records),
                None => Table::single_column(column, items),
            },
            StepOutput::Record(record) => Table::from_records([&record]),
            StepOutput::Scalar(value) => match StepOutput::from_value(value) {
                StepOutput::Scalar(value) => Table::single_column(column, vec![value]),
                shaped => shaped.into_table(column),
            },
        }
    }

    /// The single cell a `map` row produces. Tables cannot live in a cell.
    pub fn into_cell(self) -> Option<Value> {
        match self {
            StepOutput::Table(_) => None,
            StepOutput::Scalar(value) => match StepOutput::from_value(value) {
                StepOutput::Scalar(value) => Some(value),
                shaped => shaped.into_cell(),
            },
            StepOutput::Record(record) => Some(Value::Record(record)),
            StepOutput::List(items) => Some(Value::List(items)),
            StepOutput::Records(records) => Some(Value::List(
                records.into_iter().map(Value::Record).collect(),
            )),
        }
    }

    /// The elements an `expand` row explodes into. A non-list result is a
    /// single element.
    pub fn into_elements(self) -> Option<Vec<Value>> {
        match self {
            StepOutput::Table(_) => None,
            StepOutput::List(items) | StepOutput::Scalar(Value::List(items)) => Some(items),
            StepOutput::Records(records) => Some(records.into_iter().map(Value::Record).collect()),
            StepOutput::Record(record) => Some(vec![Value::Record(record)]),
            StepOutput::Scalar(value) => Some(vec![value]),
        }
    }
}

/// `Some` when the list is non-empty and every item is a record
fn all_records(items: &[Value]) -> Option<Vec<&Record>> {
    if items.is_empty() {
        return None;
    }
    items.iter().map(Value::as_record).collect()
}

impl From<Table> for StepOutput {
    fn from(table: Table) -> Self {
        StepOutput::Table(table)
    }
}

impl From<Value> for StepOutput {
    fn from(value: Value) -> Self {
        StepOutput::from_value(value)
    }
}

impl From<Record> for StepOutput {
    fn from(record: Record) -> Self {
        StepOutput::Record(record)
    }
}

impl From<Vec<Record>> for StepOutput {
    fn from(records: Vec<Record>) -> Self {
        StepOutput::Records(records)
    }
}

impl From<Vec<Value>> for StepOutput {
    fn from(items: Vec<Value>) -> Self {
        StepOutput::List(items)
    }
}

impl From<Vec<String>> for StepOutput {
    fn from(items: Vec<String>) -> Self {
        StepOutput::List(items.into_iter().map(Value::Str).collect())
    }
}

impl From<String> for StepOutput {
    fn from(s: String) -> Self {
        StepOutput::Scalar(Value::Str(s))
    }
}

impl From<&str> for StepOutput {
    fn from(s: &str) -> Self {
        StepOutput::Scalar(Value::from(s))
    }
}

impl From<f64> for StepOutput {
    fn from(x: f64) -> Self {
        StepOutput::Scalar(Value::Float(x))
    }
}

impl From<i64> for StepOutput {
    fn from(n: i64) -> Self {
        StepOutput::Scalar(Value::Int(n))
    }
}

impl From<bool> for StepOutput {
    fn from(b: bool) -> Self {
        StepOutput::Scalar(Value::Bool(b))
    }
}
