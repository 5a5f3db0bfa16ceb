//! Pipeline definitions and the sequential runner
//!
//! A pipeline is an ordered list of labelled steps. Each step consumes the
//! previous step's output and may reference any earlier step's columns by
//! label. Steps are committed to the store one at a time, so a failure part
//! way through leaves every earlier output in place.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

use crate::engine::Engine;
use crate::errors::StepError;
use crate::types::{DatasetRef, StepRunRequest, StepRunResult};
use crate::value::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default = "generate_id")]
    pub id: String,
    pub name: String,
    pub steps: Vec<PipelineStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// Name other steps use in `=Label!Column` references
    #[serde(alias = "step_id")]
    pub label: String,
    pub operation_id: String,
    #[serde(default)]
    pub config: Record,
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline '{0}' has no steps")]
    Empty(String),

    #[error("Step label '{0}' is used more than once")]
    DuplicateLabel(String),

    #[error("Step '{label}' failed: {source}")]
    StepFailed {
        label: String,
        #[source]
        source: StepError,
        /// Steps that finished before the failure, still in the store
        completed: Vec<CompletedStep>,
    },
}

/// A step that ran to completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedStep {
    pub label: String,
    pub operation_id: String,
    pub result: StepRunResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub pipeline_id: String,
    pub steps: Vec<CompletedStep>,
}

impl PipelineRun {
    /// Reference to the last step's output
    pub fn output(&self) -> Option<DatasetRef> {
        self.steps.last().map(|step| step.result.new_reference)
    }
}

impl PipelineDefinition {
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).context("Failed to parse pipeline JSON")
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse pipeline TOML")
    }

    /// Load a `.toml` or `.json` pipeline file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
        let definition = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&source),
            _ => Self::from_json(&source),
        };
        definition.with_context(|| format!("Invalid pipeline file {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::Empty(self.name.clone()));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.label.as_str()) {
                return Err(PipelineError::DuplicateLabel(step.label.clone()));
            }
        }
        Ok(())
    }
}

/// Run every step in order, stopping at the first failure
pub fn run_pipeline(
    engine: &Engine,
    pipeline: &PipelineDefinition,
    preview: bool,
) -> Result<PipelineRun, PipelineError> {
    pipeline.validate()?;
    info!(pipeline = %pipeline.name, steps = pipeline.steps.len(), "Running pipeline");

    let mut labels: HashMap<String, DatasetRef> = HashMap::new();
    let mut previous: Option<DatasetRef> = None;
    let mut completed = Vec::with_capacity(pipeline.steps.len());

    for (index, step) in pipeline.steps.iter().enumerate() {
        let request = StepRunRequest {
            operation_id: step.operation_id.clone(),
            config: step.config.clone(),
            input_reference: previous,
            label_to_reference_map: labels.clone(),
            preview,
        };

        let result = match engine.run_step(&request) {
            Ok(result) => result,
            Err(source) => {
                error!(
                    pipeline = %pipeline.name,
                    step = index + 1,
                    label = %step.label,
                    "Pipeline stopped: {}",
                    source
                );
                return Err(PipelineError::StepFailed {
                    label: step.label.clone(),
                    source,
                    completed,
                });
            }
        };

        labels.insert(step.label.clone(), result.new_reference);
        previous = Some(result.new_reference);
        completed.push(CompletedStep {
            label: step.label.clone(),
            operation_id: step.operation_id.clone(),
            result,
        });
    }

    Ok(PipelineRun {
        pipeline_id: pipeline.id.clone(),
        steps: completed,
    })
}

/// SHA-256 of a pipeline source, as lowercase hex
pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
