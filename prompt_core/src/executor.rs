use crate::registry::RegisteredExporter;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Outcome of one exporter within a single scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub exporter: String,
    pub output: Vec<u8>,
    pub succeeded: bool,
}

impl ProbeResult {
    fn failed(exporter: &RegisteredExporter) -> Self {
        Self {
            exporter: exporter.name().to_string(),
            output: Vec::new(),
            succeeded: false,
        }
    }
}

type WorkItem = (usize, Arc<RegisteredExporter>);

/// Runs exporters on a bounded pool of workers.
#[derive(Debug, Clone)]
pub struct Executor {
    max_concurrency: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl Executor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Fetches every target and returns the results in target order.
    ///
    /// Failed fetches are counted against their exporter and yield no output.
    pub async fn execute(&self, targets: &[Arc<RegisteredExporter>]) -> Vec<ProbeResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let (queue, pending) = mpsc::unbounded_channel::<WorkItem>();
        for (position, target) in targets.iter().enumerate() {
            // The receiver is alive until the workers are spawned.
            let _ = queue.send((position, target.clone()));
        }
        drop(queue);

        let pending = Arc::new(Mutex::new(pending));
        let concurrency = targets.len().min(self.max_concurrency);
        let mut workers = JoinSet::new();

        for _ in 0..concurrency {
            let pending = pending.clone();
            workers.spawn(async move {
                let mut finished = Vec::new();
                loop {
                    let next = pending.lock().await.recv().await;
                    let Some((position, target)) = next else {
                        break;
                    };
                    finished.push((position, run_job(&target).await));
                }
                finished
            });
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; targets.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(finished) => {
                    for (position, result) in finished {
                        slots[position] = Some(result);
                    }
                }
                Err(e) => error!("Exporter worker stopped unexpectedly: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    target.record_failure();
                    ProbeResult::failed(target)
                })
            })
            .collect()
    }
}

async fn run_job(target: &RegisteredExporter) -> ProbeResult {
    debug!("Running exporter {:?}", target.name());

    match target.fetch().await {
        Ok(output) => ProbeResult {
            exporter: target.name().to_string(),
            output,
            succeeded: true,
        },
        Err(e) => {
            let failures = target.record_failure();
            warn!(
                "Exporter {:?} ({}) failed to run: {} [{} failures so far]",
                target.name(),
                target.definition().command,
                e,
                failures
            );
            ProbeResult::failed(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExporterDefinition;
    use crate::error::{PromptError, Result};
    use crate::exporters::Exporter;
    use crate::registry::ExporterRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticExporter {
        output: &'static str,
        delay: Duration,
        fail: bool,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl StaticExporter {
        fn new(output: &'static str) -> Self {
            Self {
                output,
                delay: Duration::ZERO,
                fail: false,
                running: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Exporter for StaticExporter {
        async fn produce(&self) -> Result<Vec<u8>> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                return Err(PromptError::CaptureIncomplete {
                    command: self.output.to_string(),
                    stream: "stdout",
                });
            }
            Ok(self.output.as_bytes().to_vec())
        }

        fn describe(&self) -> String {
            self.output.to_string()
        }
    }

    fn registry_of(exporters: Vec<(&str, StaticExporter)>) -> ExporterRegistry {
        let mut registry = ExporterRegistry::new();
        for (name, exporter) in exporters {
            registry
                .register(ExporterDefinition::new(name, "static"), Arc::new(exporter))
                .unwrap();
        }
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_target_order() {
        let mut slow = StaticExporter::new("b 1\n");
        slow.delay = Duration::from_secs(3);
        let registry = registry_of(vec![
            ("a", StaticExporter::new("a 1\n")),
            ("b", slow),
            ("c", StaticExporter::new("c 1\n")),
        ]);

        let results = Executor::default().execute(registry.exporters()).await;

        let names: Vec<_> = results.iter().map(|r| r.exporter.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(results[1].output, b"b 1\n");
        assert!(results.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let mut broken = StaticExporter::new("broken");
        broken.fail = true;
        let registry = registry_of(vec![("ok", StaticExporter::new("ok 1\n")), ("broken", broken)]);
        let executor = Executor::default();

        for _ in 0..3 {
            let results = executor.execute(registry.exporters()).await;
            assert!(results[0].succeeded);
            assert!(!results[1].succeeded);
            assert!(results[1].output.is_empty());
        }

        assert_eq!(registry.get("ok").unwrap().error_count(), 0);
        assert_eq!(registry.get("broken").unwrap().error_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let names: Vec<String> = (0..10).map(|i| format!("e{i}")).collect();

        let mut registry = ExporterRegistry::new();
        for name in &names {
            let mut exporter = StaticExporter::new("x 1\n");
            exporter.delay = Duration::from_millis(500);
            exporter.running = running.clone();
            exporter.peak = peak.clone();
            registry
                .register(ExporterDefinition::new(name.clone(), "static"), Arc::new(exporter))
                .unwrap();
        }

        let results = Executor::new(3).execute(registry.exporters()).await;

        assert_eq!(results.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_empty_targets() {
        let results = Executor::default().execute(&[]).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        assert_eq!(Executor::new(0).max_concurrency(), 1);
        assert_eq!(Executor::default().max_concurrency(), DEFAULT_MAX_CONCURRENCY);
    }
}
