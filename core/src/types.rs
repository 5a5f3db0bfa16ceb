use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::value::{Record, Value};

/// Opaque handle to exactly one stored table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRef(Uuid);

impl DatasetRef {
    /// Allocate a fresh, globally unique reference
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DatasetRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetRef {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// How the adapter drives an operation's domain function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Produces a table from configuration alone
    Source,
    /// One call per row, one result per row
    Map,
    /// One call per row, a list of results per row
    Expand,
    /// One call with the whole table
    Dataframe,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Source => "source",
            OperationType::Map => "map",
            OperationType::Expand => "expand",
            OperationType::Dataframe => "dataframe",
        };
        write!(f, "{}", name)
    }
}

/// UI type of an operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    List,
    Object,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: String,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Catalogue entry shown to the workflow builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub id: String,
    pub label: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

/// Request to run one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRunRequest {
    pub operation_id: String,

    #[serde(default)]
    pub config: Record,

    #[serde(default, alias = "input_ref_id")]
    pub input_reference: Option<DatasetRef>,

    /// Step label -> output reference of that step
    #[serde(default, alias = "step_map")]
    pub label_to_reference_map: HashMap<String, DatasetRef>,

    #[serde(default, alias = "is_preview")]
    pub preview: bool,
}

impl StepRunRequest {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            config: Record::new(),
            input_reference: None,
            label_to_reference_map: HashMap::new(),
            preview: false,
        }
    }

    /// Set a configuration value
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn input(mut self, reference: DatasetRef) -> Self {
        self.input_reference = Some(reference);
        self
    }

    /// Make a previous step's output addressable by label
    pub fn label(mut self, label: impl Into<String>, reference: DatasetRef) -> Self {
        self.label_to_reference_map.insert(label.into(), reference);
        self
    }

    pub fn preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub row_count: usize,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRunResult {
    pub new_reference: DatasetRef,
    pub metrics: StepMetrics,
}

/// One grid cell of a paged table view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCell {
    /// Absolute row index in the stored table
    pub row_id: usize,
    pub column_id: String,
    pub value: Value,
    pub display_value: String,
}
