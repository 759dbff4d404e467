use crate::{
    cache::CachedExporter,
    definition::ExporterDefinition,
    error::{PromptError, Result},
    exporters::{DynExporter, SubprocessExporter, DEFAULT_SHELL},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How production exporters are spawned.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub shell: String,
    /// Deadline for exporters that do not set their own.
    pub default_timeout: Option<Duration>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            default_timeout: None,
        }
    }
}

/// A registered exporter together with its cache and error counter.
pub struct RegisteredExporter {
    definition: ExporterDefinition,
    cache: CachedExporter,
    errors: AtomicU64,
}

impl RegisteredExporter {
    fn new(definition: ExporterDefinition, exporter: DynExporter) -> Self {
        let cache = CachedExporter::new(exporter, definition.min_interval);
        Self {
            definition,
            cache,
            errors: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ExporterDefinition {
        &self.definition
    }

    pub async fn fetch(&self) -> Result<Vec<u8>> {
        self.cache.fetch().await
    }

    pub fn record_failure(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Exporters by name, in the order they were first registered.
#[derive(Default)]
pub struct ExporterRegistry {
    by_name: HashMap<String, Arc<RegisteredExporter>>,
    ordered: Vec<Arc<RegisteredExporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers subprocess exporters; later duplicates of a name are skipped.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ExporterDefinition>,
        settings: &RunnerSettings,
    ) -> Self {
        let mut registry = Self::new();

        for definition in definitions {
            let exporter = SubprocessExporter::new(definition.command.clone())
                .with_shell(settings.shell.clone())
                .with_timeout(definition.timeout.or(settings.default_timeout));

            if let Err(e) = registry.register(definition, Arc::new(exporter)) {
                warn!("{}; ignoring", e);
            }
        }

        registry
    }

    pub fn register(&mut self, definition: ExporterDefinition, exporter: DynExporter) -> Result<()> {
        if self.by_name.contains_key(&definition.name) {
            return Err(PromptError::DuplicateExporter(definition.name));
        }

        info!("Adding exporter {:?}", definition.name);

        let entry = Arc::new(RegisteredExporter::new(definition, exporter));
        self.by_name.insert(entry.name().to_string(), entry.clone());
        self.ordered.push(entry);

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredExporter>> {
        self.by_name.get(name)
    }

    /// Registered exporters in registration order.
    pub fn exporters(&self) -> &[Arc<RegisteredExporter>] {
        &self.ordered
    }

    pub fn list(&self) -> Vec<String> {
        self.ordered.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_keep_first_definition() {
        let registry = ExporterRegistry::from_definitions(
            vec![
                ExporterDefinition::new("a", "echo a 1"),
                ExporterDefinition::new("b", "echo b 1"),
                ExporterDefinition::new("a", "echo a 2"),
                ExporterDefinition::new("c", "echo c 1"),
                ExporterDefinition::new("b", "echo b 2"),
            ],
            &RunnerSettings::default(),
        );

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.list(), vec!["a", "b", "c"]);
        assert_eq!(registry.get("a").unwrap().definition().command, "echo a 1");
        assert_eq!(registry.get("b").unwrap().definition().command, "echo b 1");
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = ExporterRegistry::new();
        let exporter: DynExporter = Arc::new(SubprocessExporter::new("true"));

        registry
            .register(ExporterDefinition::new("a", "true"), exporter.clone())
            .unwrap();
        let err = registry
            .register(ExporterDefinition::new("a", "false"), exporter)
            .unwrap_err();

        assert!(matches!(err, PromptError::DuplicateExporter(name) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_error_counter() {
        let registry = ExporterRegistry::from_definitions(
            vec![ExporterDefinition::new("a", "false")],
            &RunnerSettings::default(),
        );
        let entry = registry.get("a").unwrap();

        assert_eq!(entry.error_count(), 0);
        assert_eq!(entry.record_failure(), 1);
        assert_eq!(entry.record_failure(), 2);
        assert_eq!(entry.error_count(), 2);
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let settings = RunnerSettings {
            default_timeout: Some(Duration::from_millis(100)),
            ..RunnerSettings::default()
        };
        let registry = ExporterRegistry::from_definitions(
            vec![ExporterDefinition::new("slow", "sleep 5")],
            &settings,
        );

        let err = registry.get("slow").unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, PromptError::ProbeTimeout { .. }));
    }
}
