use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::application::Application;
use crate::config::Config;
use crate::init::InitBuilder;
use crate::pipeline::{hash_source, PipelineDefinition};
use crate::value::Value;

#[derive(Parser)]
#[command(name = "simple-steps")]
#[command(about = "Simple Steps - run tabular step pipelines", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the operation catalogue as JSON
    Operations,

    /// Run a pipeline file (.toml or .json) step by step
    Run {
        /// Pipeline file
        pipeline: PathBuf,

        /// Limit every input table to the configured preview size
        #[arg(long)]
        preview: bool,

        /// Rows of the final table to print (default: engine.page_limit)
        #[arg(short = 'l', long = "limit")]
        limit: Option<usize>,

        /// Fail on formula references that cannot be resolved
        #[arg(long)]
        strict: bool,
    },

    /// Print the SHA-256 fingerprint of a pipeline file
    Hash {
        /// Pipeline file
        pipeline: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load config before any command so errors surface first
    let config = Config::builder()
        .config_path(cli.config.as_ref().map(PathBuf::from))
        .build()?;
    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Operations => {
            let app = init_app(cli.config, false)?;
            let definitions = app.step_service.list_operations();
            println!("{}", serde_json::to_string_pretty(&definitions)?);
        }

        Commands::Run {
            pipeline,
            preview,
            limit,
            strict,
        } => {
            let definition = PipelineDefinition::load(&pipeline)?;
            let app = init_app(cli.config, strict)?;
            let service = &app.step_service;

            println!("Pipeline: {} ({} steps)", definition.name, definition.steps.len());
            let run = service.run_pipeline(definition, preview).await?;

            for step in &run.steps {
                println!(
                    "✓ {} [{}] -> {} ({} rows; columns: {})",
                    step.label,
                    step.operation_id,
                    step.result.new_reference,
                    step.result.metrics.row_count,
                    step.result.metrics.column_names.join(", ")
                );
            }

            if let Some(output) = run.output() {
                let rows = service.get_table_page(output, 0, limit).await?;
                println!("\nFirst {} row(s):", rows.len());
                for row in rows {
                    let json = serde_json::Value::from(Value::Record(row));
                    println!("  {}", json);
                }
            }
        }

        Commands::Hash { pipeline } => {
            let source = std::fs::read_to_string(&pipeline)
                .with_context(|| format!("Failed to read pipeline file {}", pipeline.display()))?;
            println!("{}", hash_source(&source));
        }
    }

    Ok(())
}

fn init_app(config_path: Option<String>, strict: bool) -> Result<Application> {
    let mut builder = InitBuilder::new();
    if let Some(path) = config_path {
        builder = builder.config_path(path);
    }
    if strict {
        builder = builder.strict_references(true);
    }
    builder.init()
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed by an embedding host
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
