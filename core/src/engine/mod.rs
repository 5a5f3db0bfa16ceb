//! Step execution engine
//!
//! `run_step` is the single mutating entry point: it resolves the input
//! table and configuration, dispatches the operation and stores the result
//! under a fresh reference. Every run is independent; nothing is cached.


use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::errors::{panic_message, StepError};
use crate::operations::OperationRegistry;
use crate::references::{ReferenceResolver, StepConfig};
use crate::store::{DatasetStore, MemoryStore};
use crate::table::Table;
use crate::types::{
    DatasetRef, OperationDefinition, PageCell, StepMetrics, StepRunRequest, StepRunResult,
};
use crate::value::Record;

pub struct Engine {
    registry: Arc<OperationRegistry>,
    store: Arc<dyn DatasetStore>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        registry: Arc<OperationRegistry>,
        store: Arc<dyn DatasetStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            store,
            settings,
        }
    }

    /// Engine over a fresh in-memory store with default settings
    pub fn in_memory(registry: OperationRegistry) -> Self {
        Self::new(
            Arc::new(registry),
            Arc::new(MemoryStore::new()),
            EngineSettings::default(),
        )
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn DatasetStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Operation catalogue in registration order
    pub fn list_operations(&self) -> Vec<OperationDefinition> {
        self.registry.definitions()
    }

    /* ===================== Step Runs ===================== */

    pub fn run_step(&self, request: &StepRunRequest) -> Result<StepRunResult, StepError> {
        let input = match &request.input_reference {
            Some(reference) => Some(
                self.store
                    .get(reference)
                    .ok_or(StepError::InputNotFound(*reference))?,
            ),
            None => None,
        };

        let entry = self
            .registry
            .get(&request.operation_id)
            .ok_or_else(|| StepError::UnknownOperation(request.operation_id.clone()))?;

        let config = self.resolve_config(request)?;

        let truncated = match (&input, request.preview) {
            (Some(table), true) => Some(table.head(self.settings.preview_rows)),
            _ => None,
        };
        let input: Option<&Table> = truncated.as_ref().or(input.as_deref());

        info!(
            operation = entry.id(),
            operation_type = %entry.operation_type(),
            input_rows = input.map(Table::row_count),
            preview = request.preview,
            "Running step"
        );

        let output = catch_unwind(AssertUnwindSafe(|| entry.transform(input, &config)))
            .unwrap_or_else(|payload| {
                Err(StepError::operation_failed(format!(
                    "'{}' panicked: {}",
                    entry.id(),
                    panic_message(payload.as_ref())
                )))
            })
            .map_err(|err| {
                warn!(operation = entry.id(), error = %err, "Step failed");
                err
            })?;

        let metrics = StepMetrics {
            row_count: output.row_count(),
            column_names: output.column_names(),
        };
        let new_reference = self.store.save(output);

        info!(
            operation = entry.id(),
            reference = %new_reference,
            rows = metrics.row_count,
            columns = metrics.column_names.len(),
            "Step completed"
        );

        Ok(StepRunResult {
            new_reference,
            metrics,
        })
    }

    fn resolve_config(&self, request: &StepRunRequest) -> Result<Record, StepError> {
        let config = StepConfig::parse(&request.config);
        if config.references().next().is_some() {
            debug!(
                operation = %request.operation_id,
                labels = request.label_to_reference_map.len(),
                "Resolving formula references"
            );
        }
        ReferenceResolver::new(&request.label_to_reference_map, self.store.as_ref())
            .strict(self.settings.strict_references)
            .resolve(config)
    }

    /* ===================== Paging ===================== */

    /// Rows `offset..offset + limit` as records. Ranges past the end are
    /// clamped, never an error.
    pub fn get_table_page(
        &self,
        reference: &DatasetRef,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>, StepError> {
        let table = self.fetch(reference)?;
        Ok(table.slice(offset, limit).records())
    }

    /// Same window as [`Engine::get_table_page`], flattened into grid cells
    /// in row-major order
    pub fn get_cell_page(
        &self,
        reference: &DatasetRef,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageCell>, StepError> {
        let table = self.fetch(reference)?;
        let page = table.slice(offset, limit);

        let mut cells = Vec::with_capacity(page.row_count() * page.column_count());
        for row in 0..page.row_count() {
            for column in page.columns() {
                let value = column.values[row].clone();
                cells.push(PageCell {
                    row_id: offset + row,
                    column_id: column.name.clone(),
                    display_value: value.display_string(),
                    value,
                });
            }
        }
        Ok(cells)
    }

    fn fetch(&self, reference: &DatasetRef) -> Result<Arc<Table>, StepError> {
        self.store
            .get(reference)
            .ok_or(StepError::InputNotFound(*reference))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("operations", &self.registry.len())
            .field("settings", &self.settings)
            .finish()
    }
}
