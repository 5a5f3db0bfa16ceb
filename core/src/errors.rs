//! Step failure taxonomy

use std::any::Any;
use std::fmt;
use thiserror::Error;

use crate::table::TableError;
use crate::types::DatasetRef;

/// Failure that aborts a step run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("Operation '{0}' is not registered")]
    UnknownOperation(String),

    #[error("Input reference {0} not found or expired")]
    InputNotFound(DatasetRef),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Only raised when strict reference resolution is enabled
    #[error("Unresolved reference '={label}!{column}'")]
    UnresolvedReference { label: String, column: String },
}

impl StepError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        StepError::InvalidConfiguration(message.into())
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        StepError::OperationFailed(message.into())
    }

    /// Convert an error raised by a domain function.
    ///
    /// A `StepError` raised inside the function keeps its kind; anything
    /// else becomes `OperationFailed` with the full context chain.
    pub fn from_domain(err: anyhow::Error) -> Self {
        match err.downcast::<StepError>() {
            Ok(step_error) => step_error,
            Err(other) => StepError::OperationFailed(format!("{:#}", other)),
        }
    }
}

/// Text carried by a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

impl From<TableError> for StepError {
    fn from(err: TableError) -> Self {
        StepError::OperationFailed(err.to_string())
    }
}

/// A single row's invocation failed. Recorded as a null cell and logged,
/// never returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub operation_id: String,
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error in row {} of operation '{}': {}",
            self.row, self.operation_id, self.message
        )
    }
}
