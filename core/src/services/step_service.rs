use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinError;

use crate::engine::Engine;
use crate::errors::StepError;
use crate::pipeline::{self, PipelineDefinition, PipelineRun};
use crate::types::{DatasetRef, OperationDefinition, PageCell, StepRunRequest, StepRunResult};
use crate::value::Record;

/// Async boundary over the engine
///
/// Step runs call arbitrary domain functions, which may block on I/O, so
/// every run goes through `spawn_blocking` instead of the async worker
/// threads.
#[derive(Clone)]
pub struct StepService {
    engine: Arc<Engine>,
}

impl StepService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn list_operations(&self) -> Vec<OperationDefinition> {
        self.engine.list_operations()
    }

    /// Run one step
    pub async fn run_step(&self, request: StepRunRequest) -> Result<StepRunResult, StepError> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.run_step(&request))
            .await
            .map_err(join_error)?
    }

    /// Read a page of rows. `None` uses the configured page limit.
    pub async fn get_table_page(
        &self,
        reference: DatasetRef,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StepError> {
        let limit = limit.unwrap_or(self.engine.settings().page_limit);
        self.engine.get_table_page(&reference, offset, limit)
    }

    pub async fn get_cell_page(
        &self,
        reference: DatasetRef,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<PageCell>, StepError> {
        let limit = limit.unwrap_or(self.engine.settings().page_limit);
        self.engine.get_cell_page(&reference, offset, limit)
    }

    /// Run a whole pipeline on the blocking pool
    pub async fn run_pipeline(
        &self,
        definition: PipelineDefinition,
        preview: bool,
    ) -> Result<PipelineRun> {
        let engine = Arc::clone(&self.engine);
        let run = tokio::task::spawn_blocking(move || {
            pipeline::run_pipeline(&engine, &definition, preview)
        })
        .await
        .map_err(join_error)??;
        Ok(run)
    }
}

fn join_error(err: JoinError) -> StepError {
    StepError::operation_failed(format!("Step task did not complete: {}", err))
}
