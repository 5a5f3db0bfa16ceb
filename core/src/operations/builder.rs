//! Builder for registering plain functions as operations

use std::sync::Arc;

use super::{Args, OperationEntry, StepFn, StepOutput};
use crate::table::Table;
use crate::types::{OperationDefinition, ParamKind, Parameter};
use crate::value::Value;

/// Describes an operation, then wraps a domain function into an
/// [`OperationEntry`].
///
/// The finisher chosen (`source`, `map`, `expand`, `dataframe`) fixes the
/// operation type, so the function's signature always matches how the
/// adapter will call it.
///
/// ```
/// use simple_steps_core::operations::StepBuilder;
/// use simple_steps_core::types::ParamKind;
///
/// let entry = StepBuilder::new("yt_fetch_videos")
///     .label("Fetch Channel Videos")
///     .category("YouTube")
///     .param("channel_url", ParamKind::String, "Channel URL")
///     .source(|args| {
///         let url = args.str("channel_url")?;
///         Ok((1..=3).map(|i| format!("{url}/video/{i}")).collect::<Vec<_>>().into())
///     });
/// assert_eq!(entry.definition.parameters.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct StepBuilder {
    id: String,
    label: Option<String>,
    description: String,
    category: String,
    parameters: Vec<Parameter>,
    output_column: Option<String>,
}

impl StepBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: String::new(),
            category: "General".to_string(),
            parameters: Vec::new(),
            output_column: None,
        }
    }

    /// Display name. Defaults to the id in title case.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sidebar grouping
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Declare a configuration parameter with no default
    pub fn param(self, name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        self.push_param(name.into(), kind, description.into(), None)
    }

    /// Declare a configuration parameter used when the config omits it
    pub fn param_with_default(
        self,
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        self.push_param(name.into(), kind, description.into(), Some(default.into()))
    }

    /// Column that scalar results are written to
    pub fn output_column(mut self, name: impl Into<String>) -> Self {
        self.output_column = Some(name.into());
        self
    }

    fn push_param(
        mut self,
        name: String,
        kind: ParamKind,
        description: String,
        default: Option<Value>,
    ) -> Self {
        let description = if description.is_empty() {
            "No description provided".to_string()
        } else {
            description
        };
        self.parameters.retain(|p| p.name != name);
        self.parameters.push(Parameter {
            name,
            kind,
            description,
            default,
        });
        self
    }

    /// Generates a table from configuration alone
    pub fn source<F>(self, f: F) -> OperationEntry
    where
        F: Fn(&Args) -> anyhow::Result<StepOutput> + Send + Sync + 'static,
    {
        self.finish(StepFn::Source(Arc::new(f)))
    }

    /// Called once per row with the active cell
    pub fn map<F>(self, f: F) -> OperationEntry
    where
        F: Fn(&Value, &Args) -> anyhow::Result<StepOutput> + Send + Sync + 'static,
    {
        self.finish(StepFn::Map(Arc::new(f)))
    }

    /// Called once per row; each result element becomes its own row
    pub fn expand<F>(self, f: F) -> OperationEntry
    where
        F: Fn(&Value, &Args) -> anyhow::Result<StepOutput> + Send + Sync + 'static,
    {
        self.finish(StepFn::Expand(Arc::new(f)))
    }

    /// Called once with the whole input table
    pub fn dataframe<F>(self, f: F) -> OperationEntry
    where
        F: Fn(&Table, &Args) -> anyhow::Result<Table> + Send + Sync + 'static,
    {
        self.finish(StepFn::Dataframe(Arc::new(f)))
    }

    fn finish(self, func: StepFn) -> OperationEntry {
        let label = self.label.unwrap_or_else(|| title_case(&self.id));
        OperationEntry {
            definition: OperationDefinition {
                id: self.id,
                label,
                description: self.description,
                parameters: self.parameters,
            },
            category: self.category,
            output_column: self.output_column,
            func,
        }
    }
}

/// `fetch_channel_videos` -> `Fetch Channel Videos`
fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
