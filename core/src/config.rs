//! Layered configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `SIMPLE_STEPS_CONFIG_PATH`, or `./simple-steps.toml`)
//! 3. `SIMPLE_STEPS__SECTION__KEY` environment variables
//! 4. explicit [`ConfigBuilder`] overrides

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "SIMPLE_STEPS_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "simple-steps.toml";
const ENV_PREFIX: &str = "SIMPLE_STEPS";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Input rows kept when a step runs in preview mode
    pub preview_rows: usize,
    /// Default page size for table reads
    pub page_limit: usize,
    /// Fail on formula references that cannot be resolved
    pub strict_references: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preview_rows: 50,
            page_limit: 50,
            strict_references: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    fn validate(&self) -> Result<()> {
        if self.engine.preview_rows == 0 {
            bail!("engine.preview_rows must be at least 1");
        }
        if self.engine.page_limit == 0 {
            bail!("engine.page_limit must be at least 1");
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    preview_rows: Option<usize>,
    page_limit: Option<usize>,
    strict_references: Option<bool>,
    log_level: Option<String>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn preview_rows(mut self, rows: Option<usize>) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn page_limit(mut self, limit: Option<usize>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn strict_references(mut self, strict: Option<bool>) -> Self {
        self.strict_references = strict;
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("engine.preview_rows", defaults.engine.preview_rows as i64)?
            .set_default("engine.page_limit", defaults.engine.page_limit as i64)?
            .set_default("engine.strict_references", defaults.engine.strict_references)?
            .set_default("logging.level", defaults.logging.level)?;

        let explicit_path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        builder = match &explicit_path {
            Some(path) => builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(true),
            ),
            None => builder.add_source(
                config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false),
            ),
        };

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(rows) = self.preview_rows {
            builder = builder.set_override("engine.preview_rows", rows as i64)?;
        }
        if let Some(limit) = self.page_limit {
            builder = builder.set_override("engine.page_limit", limit as i64)?;
        }
        if let Some(strict) = self.strict_references {
            builder = builder.set_override("engine.strict_references", strict)?;
        }
        if let Some(level) = self.log_level {
            builder = builder.set_override("logging.level", level)?;
        }

        let config: Config = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match &explicit_path {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }
}
