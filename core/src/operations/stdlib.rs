//! Standard library operations
//!
//! General-purpose file and cleaning steps available in every registry built
//! with [`OperationRegistry::with_stdlib`](super::OperationRegistry::with_stdlib).

use anyhow::{Context, Result};
use std::path::Path;

use super::{Args, OperationRegistry, StepBuilder, StepOutput};
use crate::errors::StepError;
use crate::table::Table;
use crate::types::ParamKind;
use crate::value::Value;

/// Register every standard library operation
pub fn register(registry: &mut OperationRegistry) {
    registry.register(
        StepBuilder::new("load_csv")
            .label("Load CSV")
            .category("File IO")
            .description("Load a standard CSV file from a path")
            .param("filepath", ParamKind::String, "Path to the CSV file")
            .source(load_csv),
    );

    registry.register(
        StepBuilder::new("filter_rows")
            .label("Filter Rows")
            .category("Data Cleaning")
            .description("Keep rows where a column matches a condition")
            .param("column", ParamKind::String, "Column to test")
            .param("value", ParamKind::String, "Value to compare against")
            .param_with_default("mode", ParamKind::String, "equals | contains", "equals")
            .dataframe(filter_rows),
    );

    registry.register(
        StepBuilder::new("drop_na")
            .label("Clean Missing Values")
            .category("Data Cleaning")
            .description("Drop rows with missing data")
            .dataframe(drop_na),
    );
}

/* ===================== File IO ===================== */

pub fn load_csv(args: &Args) -> Result<StepOutput> {
    let filepath = args
        .opt_str("filepath")
        .ok_or_else(|| StepError::invalid_config("Filepath is required"))?;
    let table = read_csv(Path::new(filepath))
        .with_context(|| format!("Failed to load CSV from {}", filepath))?;
    Ok(StepOutput::Table(table))
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in columns.iter_mut().zip(record.iter()) {
            column.push(parse_cell(field));
        }
    }

    Ok(Table::from_columns(headers.into_iter().zip(columns))?)
}

/// Text read as a missing value, in addition to the empty field
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Infer a cell value from CSV text. Empty fields and the usual missing
/// value markers become null.
fn parse_cell(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed) {
        return Value::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        return if x.is_finite() { Value::Float(x) } else { Value::Null };
    }
    match trimmed {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::Str(field.to_string()),
    }
}

/* ===================== Data Cleaning ===================== */

pub fn filter_rows(table: &Table, args: &Args) -> Result<Table> {
    let column = args.str("column")?;
    let value = args.get("value").cloned().unwrap_or(Value::Null);
    let mode = args.opt_str("mode").unwrap_or("equals");

    let Some(cells) = table.column(column) else {
        // Unknown column: nothing to filter on
        return Ok(table.clone());
    };

    let matches: Box<dyn Fn(&Value) -> bool> = match mode {
        "equals" => Box::new(move |cell| cell_equals(cell, &value)),
        "contains" => {
            let needle = value.display_string();
            Box::new(move |cell| !cell.is_null() && cell.display_string().contains(&needle))
        }
        other => {
            return Err(StepError::invalid_config(format!(
                "Unknown filter mode '{}' (expected 'equals' or 'contains')",
                other
            ))
            .into())
        }
    };

    Ok(table.filter_rows(|row, _| matches(&cells[row])))
}

/// Equality that lets a numeric cell match a numeric-looking string
fn cell_equals(cell: &Value, expected: &Value) -> bool {
    if cell == expected {
        return true;
    }
    let as_number = |v: &Value| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    };
    match (cell, expected) {
        (Value::Int(_) | Value::Float(_), _) | (_, Value::Int(_) | Value::Float(_)) => {
            matches!((as_number(cell), as_number(expected)), (Some(a), Some(b)) if a == b)
        }
        _ => !cell.is_null() && cell.display_string() == expected.display_string(),
    }
}

pub fn drop_na(table: &Table, _args: &Args) -> Result<Table> {
    Ok(table.filter_rows(|row, t| {
        t.columns().iter().all(|c| !is_missing(&c.values[row]))
    }))
}

/// Null, or a float that is NaN or infinite
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Float(x) => !x.is_finite(),
        _ => false,
    }
}
