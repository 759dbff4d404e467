use crate::exposition::SelfMetrics;
use prompt_core::{Executor, ExporterRegistry, ProbeResult, PromptError, RegisteredExporter};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Ok,
    NotFound,
    NoContent,
}

#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    pub status: ScrapeStatus,
    pub body: Vec<u8>,
    /// Per exporter outcomes, in registry order.
    pub results: Vec<ProbeResult>,
}

impl ScrapeResponse {
    fn empty(status: ScrapeStatus, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            results: Vec::new(),
        }
    }

    pub fn failed_exporters(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| r.exporter.as_str())
            .collect()
    }
}

/// Builds the scrape body for all exporters or for a single one.
pub struct ScrapeAggregator {
    registry: Arc<ExporterRegistry>,
    executor: Executor,
}

impl ScrapeAggregator {
    pub fn new(registry: Arc<ExporterRegistry>, executor: Executor) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &ExporterRegistry {
        &self.registry
    }

    fn resolve(
        &self,
        selector: Option<&str>,
    ) -> prompt_core::Result<Vec<Arc<RegisteredExporter>>> {
        match selector {
            Some(name) => self
                .registry
                .get(name)
                .map(|exporter| vec![exporter.clone()])
                .ok_or_else(|| PromptError::ExporterNotFound(name.to_string())),
            None => Ok(self.registry.exporters().to_vec()),
        }
    }

    pub async fn handle(&self, selector: Option<&str>) -> ScrapeResponse {
        let targets = match self.resolve(selector) {
            Ok(targets) => targets,
            Err(e) => {
                error!("{}", e);
                return ScrapeResponse::empty(ScrapeStatus::NotFound, e.to_string().into_bytes());
            }
        };

        if targets.is_empty() {
            return ScrapeResponse::empty(ScrapeStatus::NoContent, Vec::new());
        }

        debug!("Scraping {} exporter(s)", targets.len());
        let results = self.executor.execute(&targets).await;

        let mut body = Vec::with_capacity(results.iter().map(|r| r.output.len()).sum());
        for result in results.iter().filter(|r| r.succeeded) {
            body.extend_from_slice(&result.output);
        }
        body.extend_from_slice(SelfMetrics::format(self.registry.exporters()).as_bytes());

        ScrapeResponse {
            status: ScrapeStatus::Ok,
            body,
            results,
        }
    }
}
