pub mod subprocess;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use subprocess::*;

/// Core trait for anything that can produce a block of metrics text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Produce the current output. Each call is a single attempt.
    async fn produce(&self) -> Result<Vec<u8>>;

    /// Human readable description used in log lines
    fn describe(&self) -> String;
}

pub type DynExporter = Arc<dyn Exporter>;
