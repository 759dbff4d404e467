pub mod cache;
pub mod definition;
pub mod error;
pub mod executor;
pub mod exporters;
pub mod registry;

pub use cache::CachedExporter;
pub use definition::ExporterDefinition;
pub use error::{PromptError, Result};
pub use executor::{Executor, ProbeResult, DEFAULT_MAX_CONCURRENCY};
pub use exporters::*;
pub use registry::{ExporterRegistry, RegisteredExporter, RunnerSettings};

// Re-export commonly used types
pub use async_trait::async_trait;
