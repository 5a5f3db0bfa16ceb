//! Cross-step formula references
//!
//! A configuration string of the form `=StepLabel!ColumnName` refers to a
//! column of an earlier step's output. Raw configuration is parsed once into
//! [`StepConfig`] (literal or reference per key), then a
//! [`ReferenceResolver`] swaps every reference for the full column, as a list.

use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::StepError;
use crate::store::DatasetStore;
use crate::types::DatasetRef;
use crate::value::{Record, Value};

#[cfg(test)]
mod tests;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "references/formula.pest"]
struct FormulaParser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("not a formula reference: {0}")]
    Syntax(String),

    #[error("formula reference has an empty {0}")]
    Empty(&'static str),
}

impl From<pest::error::Error<Rule>> for FormulaError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        FormulaError::Syntax(err.to_string())
    }
}

/* ===================== Formula References ===================== */

/// A parsed `=Label!Column` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaRef {
    pub label: String,
    pub column: String,
    raw: String,
}

impl FormulaRef {
    /// The string the reference was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Parse `=Label!Column`. Label and column are trimmed and must be non-empty.
pub fn parse_formula(source: &str) -> Result<FormulaRef, FormulaError> {
    let formula = FormulaParser::parse(Rule::formula, source)?
        .next()
        .ok_or_else(|| FormulaError::Syntax(source.to_string()))?;

    let mut label = "";
    let mut column = "";
    for pair in formula.into_inner() {
        match pair.as_rule() {
            Rule::label => label = pair.as_str().trim(),
            Rule::column => column = pair.as_str().trim(),
            _ => {}
        }
    }

    if label.is_empty() {
        return Err(FormulaError::Empty("label"));
    }
    if column.is_empty() {
        return Err(FormulaError::Empty("column"));
    }

    Ok(FormulaRef {
        label: label.to_string(),
        column: column.to_string(),
        raw: source.to_string(),
    })
}

/* ===================== Step Configuration ===================== */

/// A configuration value after boundary parsing
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Literal(Value),
    Reference(FormulaRef),
}

impl ConfigValue {
    /// Strings starting with `=` that match the formula grammar become
    /// references; everything else, malformed formulas included, is literal.
    pub fn parse(value: Value) -> Self {
        match &value {
            Value::Str(s) if s.starts_with('=') => match parse_formula(s) {
                Ok(reference) => ConfigValue::Reference(reference),
                Err(_) => ConfigValue::Literal(value),
            },
            _ => ConfigValue::Literal(value),
        }
    }
}

/// Parsed configuration of one step, in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepConfig {
    entries: Vec<(String, ConfigValue)>,
}

impl StepConfig {
    pub fn parse(raw: &Record) -> Self {
        Self {
            entries: raw
                .iter()
                .map(|(key, value)| (key.clone(), ConfigValue::parse(value.clone())))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every formula reference in the configuration
    pub fn references(&self) -> impl Iterator<Item = (&str, &FormulaRef)> {
        self.entries.iter().filter_map(|(key, value)| match value {
            ConfigValue::Reference(reference) => Some((key.as_str(), reference)),
            ConfigValue::Literal(_) => None,
        })
    }
}

/* ===================== Resolver ===================== */

/// Resolves formula references against earlier step outputs
pub struct ReferenceResolver<'a> {
    labels: &'a HashMap<String, DatasetRef>,
    store: &'a dyn DatasetStore,
    strict: bool,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(labels: &'a HashMap<String, DatasetRef>, store: &'a dyn DatasetStore) -> Self {
        Self {
            labels,
            store,
            strict: false,
        }
    }

    /// When strict, an unresolvable reference is an error instead of being
    /// passed through as its literal string
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolve every value of a parsed configuration
    pub fn resolve(&self, config: StepConfig) -> Result<Record, StepError> {
        config
            .entries
            .into_iter()
            .map(|(key, value)| {
                let resolved = match value {
                    ConfigValue::Literal(value) => value,
                    ConfigValue::Reference(reference) => self.resolve_reference(&key, reference)?,
                };
                Ok((key, resolved))
            })
            .collect()
    }

    /// Resolve a single raw configuration value
    pub fn resolve_value(&self, value: Value) -> Result<Value, StepError> {
        match ConfigValue::parse(value) {
            ConfigValue::Literal(value) => Ok(value),
            ConfigValue::Reference(reference) => self.resolve_reference("", reference),
        }
    }

    fn resolve_reference(&self, key: &str, reference: FormulaRef) -> Result<Value, StepError> {
        match self.lookup(&reference) {
            Some(values) => {
                debug!(
                    key,
                    label = %reference.label,
                    column = %reference.column,
                    rows = values.len(),
                    "Resolved formula reference"
                );
                Ok(Value::List(values))
            }
            None if self.strict => Err(StepError::UnresolvedReference {
                label: reference.label,
                column: reference.column,
            }),
            None => {
                warn!(
                    key,
                    formula = reference.raw(),
                    "Formula reference could not be resolved, passing it through as a string"
                );
                Ok(Value::Str(reference.raw))
            }
        }
    }

    /// The referenced column's values, if label, dataset and column all exist
    fn lookup(&self, reference: &FormulaRef) -> Option<Vec<Value>> {
        let dataset = self.labels.get(&reference.label)?;
        let table = self.store.get(dataset)?;
        table.column(&reference.column).map(<[Value]>::to_vec)
    }
}
