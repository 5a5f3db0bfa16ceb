pub mod application;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod init;
pub mod operations;
pub mod pipeline;
pub mod references;
pub mod services;
pub mod store;
pub mod table;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_helpers;

// Re-export main types
pub use types::*;

pub use application::Application;
pub use engine::Engine;
pub use errors::StepError;
pub use operations::{OperationRegistry, StepBuilder, StepOutput};
pub use store::{DatasetStore, MemoryStore};
pub use table::Table;
pub use value::{Record, Value};

// Re-export init API for convenience
pub use init::{initialize, InitBuilder, InitOptions};
