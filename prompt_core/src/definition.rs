use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named command whose standard output is served as metrics text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExporterDefinition {
    pub name: String,

    /// Interpreted by the shell, so pipes and redirections work.
    pub command: String,

    /// Output younger than this is replayed instead of running the command again.
    #[serde(default)]
    pub min_interval: Option<Duration>,

    /// Deadline for a single run. Falls back to the runner-wide default.
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl ExporterDefinition {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            min_interval: None,
            timeout: None,
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = Some(min_interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn description(&self) -> String {
        match self.min_interval {
            Some(interval) => format!(
                "Exporter '{}' ({}) every {:?} at most",
                self.name, self.command, interval
            ),
            None => format!("Exporter '{}' ({})", self.name, self.command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_description() {
        let definition = ExporterDefinition::new("uptime", "cat /proc/uptime");
        assert_eq!(definition.description(), "Exporter 'uptime' (cat /proc/uptime)");

        let definition = definition.with_min_interval(Duration::from_secs(5));
        assert_eq!(
            definition.description(),
            "Exporter 'uptime' (cat /proc/uptime) every 5s at most"
        );
    }
}
