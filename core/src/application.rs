//! The assembled application: configuration, engine and services

use std::sync::Arc;

use crate::config::Config;
use crate::engine::Engine;
use crate::operations::OperationRegistry;
use crate::services::StepService;
use crate::store::{DatasetStore, MemoryStore};

/// A configured engine plus the services built on it
pub struct Application {
    pub config: Config,
    pub engine: Arc<Engine>,
    pub step_service: StepService,
}

impl Application {
    /// Wire up an application (pure instantiation, no I/O)
    pub fn new(config: Config, registry: OperationRegistry) -> Self {
        Self::with_store(config, registry, Arc::new(MemoryStore::new()))
    }

    /// Same as [`Application::new`] over a caller-supplied store
    pub fn with_store(
        config: Config,
        registry: OperationRegistry,
        store: Arc<dyn DatasetStore>,
    ) -> Self {
        let engine = Arc::new(Engine::new(Arc::new(registry), store, config.engine));
        Self {
            config,
            step_service: StepService::new(Arc::clone(&engine)),
            engine,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
