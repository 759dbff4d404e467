use prompt_core::ExporterDefinition;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExporterConfig {
    pub name: String,
    pub command: String,
    #[serde(
        rename = "minInterval",
        alias = "min_interval",
        default,
        with = "duration_serde"
    )]
    pub min_interval: Option<Duration>,
    #[serde(default, with = "duration_serde")]
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Appends the exporters of `other` after our own.
    pub fn merge(&mut self, other: Config) {
        self.exporters.extend(other.exporters);
    }

    pub fn definitions(&self) -> Vec<ExporterDefinition> {
        self.exporters.iter().map(ExporterConfig::to_definition).collect()
    }

    /// Names that appear more than once, in order of their first repeat.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for exporter in &self.exporters {
            if !seen.insert(exporter.name.as_str()) && !duplicates.contains(&exporter.name.as_str()) {
                duplicates.push(exporter.name.as_str());
            }
        }
        duplicates
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, exporter) in self.exporters.iter().enumerate() {
            if exporter.name.trim().is_empty() {
                return Err(format!("Exporter {} name cannot be empty", i));
            }

            if exporter.command.trim().is_empty() {
                return Err(format!(
                    "Exporter '{}' command cannot be empty",
                    exporter.name
                ));
            }

            if exporter.timeout.is_some_and(|t| t.is_zero()) {
                return Err(format!(
                    "Exporter '{}' timeout must be > 0",
                    exporter.name
                ));
            }
        }

        Ok(())
    }
}

impl ExporterConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            min_interval: None,
            timeout: None,
        }
    }

    pub fn to_definition(&self) -> ExporterDefinition {
        ExporterDefinition {
            name: self.name.clone(),
            command: self.command.clone(),
            min_interval: self.min_interval,
            timeout: self.timeout,
        }
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    exporters: Vec<ExporterConfig>,
}

impl ConfigBuilder {
    pub fn add_exporter(mut self, exporter: ExporterConfig) -> Self {
        self.exporters.push(exporter);
        self
    }

    pub fn exporter(self, name: impl Into<String>, command: impl Into<String>) -> Self {
        self.add_exporter(ExporterConfig::new(name, command))
    }

    pub fn build(self) -> Config {
        Config {
            exporters: self.exporters,
        }
    }
}

/// Durations are written either as seconds (`30`, `0.5`) or in humantime form (`30s`).
mod duration_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(f64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawDuration>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawDuration::Seconds(secs)) => from_secs(secs).map(Some),
            Some(RawDuration::Text(text)) => match text.trim().parse::<f64>() {
                Ok(secs) => from_secs(secs).map(Some),
                Err(_) => humantime::parse_duration(text.trim())
                    .map(Some)
                    .map_err(de::Error::custom),
            },
        }
    }

    fn from_secs<E: de::Error>(secs: f64) -> Result<Duration, E> {
        Duration::try_from_secs_f64(secs).map_err(|_| {
            E::custom(format!(
                "invalid duration {}: expected a non-negative number of seconds",
                secs
            ))
        })
    }
}
