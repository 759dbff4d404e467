use super::build_registry;
use anyhow::Result;
use prompt_core::{Executor, RunnerSettings};
use prompt_metrics::{ScrapeAggregator, ScrapeStatus};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(
    name: String,
    config: Vec<PathBuf>,
    probe_timeout: Option<Duration>,
    shell: String,
) -> Result<()> {
    let settings = RunnerSettings {
        shell,
        default_timeout: probe_timeout,
    };
    let registry = build_registry(&config, &settings).await?;
    let aggregator = ScrapeAggregator::new(Arc::new(registry), Executor::new(1));

    let response = aggregator.handle(Some(&name)).await;
    if response.status == ScrapeStatus::NotFound {
        anyhow::bail!(String::from_utf8_lossy(&response.body).into_owned());
    }

    std::io::stdout().write_all(&response.body)?;

    if !response.failed_exporters().is_empty() {
        anyhow::bail!("Exporter {:?} failed to run", name);
    }

    Ok(())
}
