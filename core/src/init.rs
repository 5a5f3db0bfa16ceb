//! Initialization for Simple Steps
//!
//! Loads configuration, builds the operation registry and returns a ready
//! [`Application`].
//!
//! # Example
//!
//! ```no_run
//! use simple_steps_core::init::InitBuilder;
//! use simple_steps_core::operations::StepBuilder;
//!
//! let app = InitBuilder::new()
//!     .config_path("simple-steps.toml")
//!     .preview_rows(20)
//!     .operation(StepBuilder::new("shout").map(|cell, _| Ok(cell.display_string().to_uppercase().into())))
//!     .init()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::application::Application;
use crate::config::Config;
use crate::operations::{OperationEntry, OperationRegistry};

/// Options for initializing Simple Steps
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Config file path (overrides default search)
    pub config_path: Option<String>,

    /// Preview row count (overrides config file and env vars)
    pub preview_rows: Option<usize>,

    /// Strict formula references (overrides config file and env vars)
    pub strict_references: Option<bool>,

    /// Register the standard library before custom operations
    pub include_stdlib: bool,

    /// Operations registered after the standard library, in order
    pub operations: Vec<OperationEntry>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            preview_rows: None,
            strict_references: None,
            include_stdlib: true,
            operations: Vec::new(),
        }
    }
}

/// Builder for constructing InitOptions
#[derive(Default)]
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.options.preview_rows = Some(rows);
        self
    }

    pub fn strict_references(mut self, strict: bool) -> Self {
        self.options.strict_references = Some(strict);
        self
    }

    /// Set whether the standard library is registered
    pub fn include_stdlib(mut self, include: bool) -> Self {
        self.options.include_stdlib = include;
        self
    }

    /// Add one operation
    pub fn operation(mut self, entry: OperationEntry) -> Self {
        self.options.operations.push(entry);
        self
    }

    /// Add several operations
    pub fn operations(mut self, entries: impl IntoIterator<Item = OperationEntry>) -> Self {
        self.options.operations.extend(entries);
        self
    }

    pub fn init(self) -> Result<Application> {
        initialize(self.options)
    }
}

/// Load configuration and assemble an [`Application`]
pub fn initialize(options: InitOptions) -> Result<Application> {
    let config = Config::builder()
        .config_path(options.config_path.map(PathBuf::from))
        .preview_rows(options.preview_rows)
        .strict_references(options.strict_references)
        .build()
        .context("Failed to load configuration")?;

    let mut registry = if options.include_stdlib {
        OperationRegistry::with_stdlib()
    } else {
        OperationRegistry::new()
    };
    for entry in options.operations {
        let id = entry.id().to_string();
        if registry.register(entry).is_some() {
            debug!(operation = %id, "Replaced previously registered operation");
        }
    }

    info!(
        operations = registry.len(),
        preview_rows = config.engine.preview_rows,
        strict_references = config.engine.strict_references,
        "Simple Steps initialized"
    );

    Ok(Application::new(config, registry))
}
