//! Type dispatch: turns a domain function into a table transform
//!
//! - `source`: called once with name-bound configuration, result normalized to a table
//! - `dataframe`: called once with the whole input table
//! - `map`: called per row with the active cell, results merged as new column(s)
//! - `expand`: called per row, each result list exploded into rows

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use super::{Args, OperationEntry, RowFn, StepFn, StepOutput, TARGET_COLUMN};
use crate::errors::{panic_message, RowFailure, StepError};
use crate::table::Table;
use crate::types::OperationType;
use crate::value::{Record, Value};

/// Run `entry` against an optional input table and resolved configuration
pub(super) fn execute(
    entry: &OperationEntry,
    input: Option<&Table>,
    config: &Record,
) -> Result<Table, StepError> {
    let params = &entry.definition.parameters;

    match &entry.func {
        StepFn::Source(f) => {
            let args = Args::bind(params, config);
            let output = f(&args).map_err(StepError::from_domain)?;
            Ok(output.into_table(&entry.scalar_column()))
        }

        StepFn::Dataframe(f) => {
            let table = require_input(input, OperationType::Dataframe)?;
            let args = Args::bind(params, config);
            f(table, &args).map_err(StepError::from_domain)
        }

        StepFn::Map(f) => {
            let table = require_input(input, OperationType::Map)?;
            let args = Args::bind(params, config);
            let results = invoke_rows(entry, f, table, &args, config)?;
            merge_map(entry, table, results)
        }

        StepFn::Expand(f) => {
            let table = require_input(input, OperationType::Expand)?;
            let args = Args::bind(params, config);
            let results = invoke_rows(entry, f, table, &args, config)?;
            merge_expand(entry, table, results)
        }

        StepFn::Transform(_, f) => {
            let args = Args::new(config.clone());
            f(input, &args).map_err(StepError::from_domain)
        }
    }
}

fn require_input(input: Option<&Table>, operation_type: OperationType) -> Result<&Table, StepError> {
    input.ok_or_else(|| {
        StepError::operation_failed(format!(
            "Input table is required for {} operations",
            operation_type
        ))
    })
}

/// Pick the column a row-wise operation reads from
fn active_column<'t>(table: &'t Table, config: &Record) -> Result<(&'t str, &'t [Value]), StepError> {
    let requested = config
        .get(TARGET_COLUMN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let column = match requested {
        Some(name) => table
            .columns()
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                StepError::invalid_config(format!("Column '{}' not found in input data", name))
            })?,
        None => table
            .columns()
            .first()
            .ok_or_else(|| StepError::invalid_config("No columns in input data to map over"))?,
    };
    Ok((column.name.as_str(), column.values.as_slice()))
}

/// Call `f` once per row. A failing or panicking row is logged and yields
/// `None`.
fn invoke_rows(
    entry: &OperationEntry,
    f: &RowFn,
    table: &Table,
    args: &Args,
    config: &Record,
) -> Result<Vec<Option<StepOutput>>, StepError> {
    let (column, cells) = active_column(table, config)?;
    debug!(
        operation = entry.id(),
        column,
        rows = cells.len(),
        "Running '{}' on column '{}'",
        entry.definition.label,
        column
    );

    Ok(cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match catch_unwind(AssertUnwindSafe(|| f(cell, args))) {
            Ok(Ok(output)) => Some(output),
            Ok(Err(err)) => {
                report_row_failure(entry, row, format!("{:#}", err));
                None
            }
            Err(payload) => {
                report_row_failure(entry, row, format!("panicked: {}", panic_message(payload.as_ref())));
                None
            }
        })
        .collect())
}

fn report_row_failure(entry: &OperationEntry, row: usize, message: String) {
    let failure = RowFailure {
        operation_id: entry.id().to_string(),
        row,
        message,
    };
    warn!(operation = %failure.operation_id, row = failure.row, "{}", failure);
}

/// One result per input row: records flatten into columns, anything else
/// becomes a single output column
fn merge_map(
    entry: &OperationEntry,
    table: &Table,
    results: Vec<Option<StepOutput>>,
) -> Result<Table, StepError> {
    let cells: Vec<Value> = results
        .into_iter()
        .enumerate()
        .map(|(row, result)| match result.map(StepOutput::into_cell) {
            Some(Some(value)) => value,
            Some(None) => {
                report_row_failure(entry, row, "a table cannot be stored in a single cell".to_string());
                Value::Null
            }
            None => Value::Null,
        })
        .collect();

    merge_values(table, cells, &entry.scalar_column())
}

/// Replicate each row once per element of its result list, then merge the
/// elements the same way `map` merges its results
fn merge_expand(
    entry: &OperationEntry,
    table: &Table,
    results: Vec<Option<StepOutput>>,
) -> Result<Table, StepError> {
    let mut indices = Vec::new();
    let mut elements = Vec::new();

    for (row, result) in results.into_iter().enumerate() {
        let row_elements = match result.map(StepOutput::into_elements) {
            Some(Some(items)) => items,
            Some(None) => {
                report_row_failure(entry, row, "a table cannot be exploded into rows".to_string());
                vec![Value::Null]
            }
            // failed rows survive once with an absent result
            None => vec![Value::Null],
        };
        for element in row_elements {
            indices.push(row);
            elements.push(element);
        }
    }

    let exploded = table.take_rows(&indices)?;
    merge_values(&exploded, elements, &entry.scalar_column())
}

/// Merge row-aligned values into `base`.
///
/// When every non-null value is a record (and there is at least one), the
/// records are flattened into columns; otherwise the values become
/// `scalar_column`.
fn merge_values(base: &Table, values: Vec<Value>, scalar_column: &str) -> Result<Table, StepError> {
    let mut non_null = values.iter().filter(|v| !v.is_null()).peekable();
    let flatten = non_null.peek().is_some() && non_null.all(Value::is_record);

    if !flatten {
        return Ok(base.with_column(scalar_column, values)?);
    }

    let records: Vec<Record> = values
        .into_iter()
        .map(|value| match value {
            Value::Record(record) => record,
            _ => Record::new(),
        })
        .collect();
    let flattened = Table::from_records(&records);

    let mut merged = base.clone();
    for column in flattened.columns() {
        merged = merged.with_column(column.name.clone(), column.values.clone())?;
    }
    Ok(merged)
}
