//! Shared fixtures: a fresh registry, store and engine per test

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::engine::Engine;
use crate::operations::{OperationRegistry, StepBuilder, StepOutput};
use crate::store::{DatasetStore, MemoryStore};
use crate::table::Table;
use crate::types::{DatasetRef, ParamKind};
use crate::value::{Record, Value};

/// Stdlib plus a handful of small demo operations
pub fn demo_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::with_stdlib();

    registry.register(
        StepBuilder::new("fetch_videos")
            .label("Fetch Channel Videos")
            .category("Demo")
            .param("channel_url", ParamKind::String, "Channel URL")
            .source(|args| {
                let url = args.str("channel_url")?;
                Ok((1..=3).map(|i| format!("{url}/{i}")).collect::<Vec<_>>().into())
            }),
    );

    registry.register(
        StepBuilder::new("echo_vals")
            .label("Echo Values")
            .category("Demo")
            .param("vals", ParamKind::List, "Values to echo")
            .output_column("Result")
            .source(|args| {
                let vals = args
                    .get("vals")
                    .and_then(Value::as_list)
                    .ok_or_else(|| anyhow::anyhow!("expected a list of values"))?;
                Ok(StepOutput::List(vals.to_vec()))
            }),
    );

    registry.register(
        StepBuilder::new("word_count")
            .label("Word Count")
            .category("Demo")
            .map(|cell, _| {
                let text = cell
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("expected text, got {}", cell))?;
                Ok(StepOutput::from(text.split_whitespace().count() as i64))
            }),
    );

    registry.register(
        StepBuilder::new("split_words")
            .label("Split Words")
            .category("Demo")
            .expand(|cell, _| {
                let words: Vec<String> = cell
                    .display_string()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                Ok(words.into())
            }),
    );

    registry.register(
        StepBuilder::new("summarize")
            .label("Summarize")
            .category("Demo")
            .dataframe(|table, _| {
                let mut summary = Record::new();
                summary.insert("rows".to_string(), Value::from(table.row_count()));
                summary.insert("columns".to_string(), Value::from(table.column_count()));
                Ok(Table::from_records([&summary]))
            }),
    );

    registry
}

pub fn engine_with(settings: EngineSettings) -> Engine {
    Engine::new(
        Arc::new(demo_registry()),
        Arc::new(MemoryStore::new()),
        settings,
    )
}

pub fn engine() -> Engine {
    engine_with(EngineSettings::default())
}

/// Save `table` directly, bypassing any operation
pub fn seed(engine: &Engine, table: Table) -> DatasetRef {
    engine.store().save(table)
}

pub fn sentences() -> Table {
    Table::single_column(
        "text",
        vec![
            Value::from("the quick fox"),
            Value::Null,
            Value::from("jumps"),
        ],
    )
}

pub fn numbered(rows: usize) -> Table {
    Table::single_column("n", (0..rows).map(Value::from).collect())
}
