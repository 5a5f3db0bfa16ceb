//! Operation registry
//!
//! Maps operation ids to their definition and the callable the adapter
//! dispatches. The registry is an ordinary value: build one at startup,
//! register every operation, then share it read-only with the engine.

mod adapter;
mod args;
mod builder;
mod output;
pub mod stdlib;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::StepError;
use crate::table::Table;
use crate::types::{OperationDefinition, OperationType};
use crate::value::{Record, Value};

pub use args::{Args, TARGET_COLUMN};
pub use builder::StepBuilder;
pub use output::StepOutput;

/* ===================== Callable Types ===================== */

pub type SourceFn = Arc<dyn Fn(&Args) -> anyhow::Result<StepOutput> + Send + Sync>;
pub type RowFn = Arc<dyn Fn(&Value, &Args) -> anyhow::Result<StepOutput> + Send + Sync>;
pub type TableFn = Arc<dyn Fn(&Table, &Args) -> anyhow::Result<Table> + Send + Sync>;
pub type TransformFn = Arc<dyn Fn(Option<&Table>, &Args) -> anyhow::Result<Table> + Send + Sync>;

/// The domain function behind an operation, tagged by how it is driven
#[derive(Clone)]
pub enum StepFn {
    Source(SourceFn),
    Map(RowFn),
    Expand(RowFn),
    Dataframe(TableFn),
    /// A ready-made table transform registered without adapter help
    Transform(OperationType, TransformFn),
}

impl StepFn {
    pub fn operation_type(&self) -> OperationType {
        match self {
            StepFn::Source(_) => OperationType::Source,
            StepFn::Map(_) => OperationType::Map,
            StepFn::Expand(_) => OperationType::Expand,
            StepFn::Dataframe(_) => OperationType::Dataframe,
            StepFn::Transform(operation_type, _) => *operation_type,
        }
    }
}

/* ===================== Operation Entry ===================== */

/// A registered operation
#[derive(Clone)]
pub struct OperationEntry {
    pub definition: OperationDefinition,
    pub category: String,
    /// Column name for scalar results; `None` uses the type's default
    pub output_column: Option<String>,
    pub func: StepFn,
}

impl OperationEntry {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn operation_type(&self) -> OperationType {
        self.func.operation_type()
    }

    /// Run the operation as a table transform
    pub fn transform(&self, input: Option<&Table>, config: &Record) -> Result<Table, StepError> {
        adapter::execute(self, input, config)
    }

    /// Name of the column scalar results are written to
    pub fn scalar_column(&self) -> String {
        match (&self.output_column, self.operation_type()) {
            (Some(name), _) => name.clone(),
            (None, OperationType::Source) => "output".to_string(),
            (None, _) => format!("{}_output", self.definition.label),
        }
    }
}

impl fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEntry")
            .field("id", &self.definition.id)
            .field("category", &self.category)
            .field("operation_type", &self.operation_type())
            .finish()
    }
}

/* ===================== Registry ===================== */

/// Catalogue of operations, in registration order
#[derive(Debug, Default, Clone)]
pub struct OperationRegistry {
    entries: Vec<OperationEntry>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the standard library
    pub fn with_stdlib() -> Self {
        let mut registry = Self::new();
        stdlib::register(&mut registry);
        registry
    }

    /// Add an operation. Re-registering an id replaces the earlier entry,
    /// keeping its position in the catalogue, and returns it.
    pub fn register(&mut self, entry: OperationEntry) -> Option<OperationEntry> {
        match self.index.get(entry.id()) {
            Some(&idx) => Some(std::mem::replace(&mut self.entries[idx], entry)),
            None => {
                self.index.insert(entry.id().to_string(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    /// Register an explicit transform together with its definition
    pub fn register_transform<F>(
        &mut self,
        definition: OperationDefinition,
        category: impl Into<String>,
        operation_type: OperationType,
        transform: F,
    ) -> Option<OperationEntry>
    where
        F: Fn(Option<&Table>, &Args) -> anyhow::Result<Table> + Send + Sync + 'static,
    {
        self.register(OperationEntry {
            definition,
            category: category.into(),
            output_column: None,
            func: StepFn::Transform(operation_type, Arc::new(transform)),
        })
    }

    pub fn get(&self, id: &str) -> Option<&OperationEntry> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &OperationEntry> {
        self.entries.iter()
    }

    /// Operation definitions for UI discovery
    pub fn definitions(&self) -> Vec<OperationDefinition> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }
}
