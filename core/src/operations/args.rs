//! Name-bound arguments handed to domain functions

use crate::errors::StepError;
use crate::types::Parameter;
use crate::value::{Record, Value};

/// Configuration key selecting the active column for `map`/`expand`
pub const TARGET_COLUMN: &str = "_target_column";

/// Configuration values bound to an operation's declared parameter names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Record,
}

impl Args {
    pub fn new(values: Record) -> Self {
        Self { values }
    }

    /// Keep only the configuration keys the operation declares, filling
    /// missing ones from the declared defaults. The target-column key is
    /// always carried along.
    pub fn bind(parameters: &[Parameter], config: &Record) -> Self {
        let mut values = Record::new();
        for param in parameters {
            match config.get(&param.name) {
                Some(value) => {
                    values.insert(param.name.clone(), value.clone());
                }
                None => {
                    if let Some(default) = &param.default {
                        values.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }
        if let Some(target) = config.get(TARGET_COLUMN) {
            values.insert(TARGET_COLUMN.to_string(), target.clone());
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn as_record(&self) -> &Record {
        &self.values
    }

    /// A present, non-null value
    pub fn require(&self, name: &str) -> Result<&Value, StepError> {
        match self.values.get(name) {
            Some(Value::Null) | None => Err(StepError::invalid_config(format!(
                "Missing required configuration value '{}'",
                name
            ))),
            Some(value) => Ok(value),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, StepError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| wrong_type(name, "a string"))
    }

    /// Like [`Args::str`] but absent, null and empty values are `None`
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Numbers, or strings that parse as numbers
    pub fn f64(&self, name: &str) -> Result<f64, StepError> {
        let value = self.require(name)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| wrong_type(name, "a number"))
    }

    pub fn i64(&self, name: &str) -> Result<i64, StepError> {
        let value = self.require(name)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| wrong_type(name, "an integer"))
    }

    pub fn bool(&self, name: &str) -> Result<bool, StepError> {
        let value = self.require(name)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Str(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::Str(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(wrong_type(name, "a boolean")),
        }
    }

    /// A list value. Resolved column references always arrive as lists.
    pub fn list(&self, name: &str) -> Result<&[Value], StepError> {
        self.require(name)?
            .as_list()
            .ok_or_else(|| wrong_type(name, "a list"))
    }

    pub fn record(&self, name: &str) -> Result<&Record, StepError> {
        self.require(name)?
            .as_record()
            .ok_or_else(|| wrong_type(name, "an object"))
    }

    pub fn target_column(&self) -> Option<&str> {
        self.opt_str(TARGET_COLUMN)
    }
}

fn wrong_type(name: &str, expected: &str) -> StepError {
    StepError::invalid_config(format!("Configuration value '{}' must be {}", name, expected))
}
