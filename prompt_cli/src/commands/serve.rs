use super::build_registry;
use crate::server;
use anyhow::Result;
use prompt_core::{Executor, RunnerSettings};
use prompt_metrics::ScrapeAggregator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn execute(
    listen: String,
    config: Vec<PathBuf>,
    max_concurrency: usize,
    probe_timeout: Option<Duration>,
    shell: String,
) -> Result<()> {
    let settings = RunnerSettings {
        shell,
        default_timeout: probe_timeout,
    };
    let registry = build_registry(&config, &settings).await?;
    info!(
        "Loaded {} exporter(s); running at most {} at a time",
        registry.len(),
        max_concurrency
    );

    let aggregator = ScrapeAggregator::new(Arc::new(registry), Executor::new(max_concurrency));
    let addr = listen_address(&listen);

    info!("Listening on {}", addr);
    server::serve(&addr, Arc::new(aggregator)).await
}

/// `:9100` listens on every interface.
fn listen_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}
