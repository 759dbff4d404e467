use crate::{error::Result, exporters::DynExporter};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct ExporterState {
    last_run_at: Option<Instant>,
    cached_output: Vec<u8>,
}

impl ExporterState {
    fn fresh(&self, min_interval: Option<Duration>, now: Instant) -> Option<&[u8]> {
        let interval = min_interval?;
        let last_run_at = self.last_run_at?;
        (now.saturating_duration_since(last_run_at) < interval)
            .then_some(self.cached_output.as_slice())
    }
}

/// Rate limits an exporter by replaying its last successful output.
///
/// Without a minimum interval every fetch runs the exporter. A failed run
/// never replaces the cached output.
pub struct CachedExporter {
    exporter: DynExporter,
    min_interval: Option<Duration>,
    state: RwLock<ExporterState>,
    refresh: Mutex<()>,
}

impl CachedExporter {
    pub fn new(exporter: DynExporter, min_interval: Option<Duration>) -> Self {
        Self {
            exporter,
            min_interval,
            state: RwLock::new(ExporterState::default()),
            refresh: Mutex::new(()),
        }
    }

    pub fn describe(&self) -> String {
        self.exporter.describe()
    }

    pub async fn last_run_at(&self) -> Option<Instant> {
        self.state.read().await.last_run_at
    }

    pub async fn fetch(&self) -> Result<Vec<u8>> {
        if let Some(cached) = self.cached().await {
            debug!("Min interval not yet met for {}; returning cached copy", self.describe());
            return Ok(cached);
        }

        if self.min_interval.is_none() {
            return self.refresh().await;
        }

        // Stale fetches queue up here; whoever comes second finds fresh output.
        let _refreshing = self.refresh.lock().await;
        if let Some(cached) = self.cached().await {
            debug!("Output of {} was refreshed concurrently", self.describe());
            return Ok(cached);
        }
        self.refresh().await
    }

    async fn cached(&self) -> Option<Vec<u8>> {
        let state = self.state.read().await;
        state
            .fresh(self.min_interval, Instant::now())
            .map(<[u8]>::to_vec)
    }

    async fn refresh(&self) -> Result<Vec<u8>> {
        let output = self.exporter.produce().await?;

        let mut state = self.state.write().await;
        state.cached_output = output.clone();
        state.last_run_at = Some(Instant::now());

        Ok(output)
    }
}
