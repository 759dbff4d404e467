use crate::config::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of the files picked up when a directory is given as a source.
pub const CONFIG_DIR_EXTENSION: &str = "conf";

pub async fn parse_config_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Unable to read config file {:?}", path.display().to_string()))?;

    let format = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or(CONFIG_DIR_EXTENSION);

    parse_config_from_str(&contents, format)
        .with_context(|| format!("Unable to parse config file {:?}", path.display().to_string()))
}

pub fn parse_config_from_str(content: &str, format: &str) -> Result<Config> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" | "conf" => parse_yaml(content),
        "toml" => parse_toml(content),
        "json" => parse_json(content),
        _ => Err(anyhow::anyhow!(
            "Unsupported format: {}. Use .conf, .yaml, .yml, .toml, or .json",
            format
        )),
    }
}

/// Loads and merges every source in order.
///
/// A directory contributes its `*.conf` files in lexical order.
pub async fn load_config(sources: &[PathBuf]) -> Result<Config> {
    let mut config = Config::default();

    for source in sources {
        let metadata = tokio::fs::metadata(source)
            .await
            .with_context(|| format!("Unable to access {:?}", source.display().to_string()))?;

        if metadata.is_dir() {
            for file in config_files_in(source).await? {
                debug!("Loading config from {}", file.display());
                config.merge(parse_config_from_file(&file).await?);
            }
        } else {
            debug!("Loading config from {}", source.display());
            config.merge(parse_config_from_file(source).await?);
        }
    }

    Ok(config)
}

async fn config_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Unable to list directory {:?}", dir.display().to_string()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_conf = path.extension().and_then(|s| s.to_str()) == Some(CONFIG_DIR_EXTENSION);
        if is_conf && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

fn parse_yaml(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(content)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

fn parse_toml(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

fn parse_json(content: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(content)?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
exporters:
  - name: "uptime"
    command: "cat /proc/uptime"
    minInterval: 30
  - name: "textfile"
    command: "cat /var/lib/metrics/*.prom"
    min_interval: 1.5
    timeout: 10s
  - name: "plain"
    command: "echo up 1"
"#;

        let config = parse_yaml(yaml).unwrap();
        assert_eq!(config.exporters.len(), 3);
        assert_eq!(config.exporters[0].min_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.exporters[1].min_interval, Some(Duration::from_millis(1500)));
        assert_eq!(config.exporters[1].timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.exporters[2].min_interval, None);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[exporters]]
name = "uptime"
command = "cat /proc/uptime"
minInterval = "2m"
"#;

        let config = parse_toml(toml).unwrap();
        assert_eq!(config.exporters[0].name, "uptime");
        assert_eq!(config.exporters[0].min_interval, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"
{
  "exporters": [
    { "name": "uptime", "command": "cat /proc/uptime", "minInterval": "5" }
  ]
}
"#;

        let config = parse_json(json).unwrap();
        assert_eq!(config.exporters[0].min_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(parse_yaml("exporters:\n  - name: a\n    command: ''\n").is_err());
        assert!(parse_yaml("exporters:\n  - name: a\n    command: x\n    minInterval: -1\n").is_err());
        assert!(parse_yaml("exporters:\n  - name: a\n").is_err());
        assert!(parse_config_from_str("", "ini").is_err());
    }

    #[test]
    fn test_parse_empty_yaml() {
        assert!(parse_yaml("").unwrap().exporters.is_empty());
        assert!(parse_yaml("exporters: []").unwrap().exporters.is_empty());
    }

    #[tokio::test]
    async fn test_load_directory_in_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("20-b.conf"),
            "exporters:\n  - name: b\n    command: echo b 1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("10-a.conf"),
            "exporters:\n  - name: a\n    command: echo a 1\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a config").unwrap();

        let extra = dir.path().join("extra.yaml");
        std::fs::write(&extra, "exporters:\n  - name: c\n    command: echo c 1\n").unwrap();

        let config = load_config(&[dir.path().to_path_buf(), extra]).await.unwrap();

        let names: Vec<_> = config.exporters.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_load_missing_source() {
        let err = load_config(&[PathBuf::from("/nonexistent/prompt.conf")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/prompt.conf"));
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.conf");
        std::fs::write(&path, "exporters: [").unwrap();

        let err = parse_config_from_file(&path).await.unwrap_err();
        assert!(err.to_string().starts_with("Unable to parse config file"));
        assert!(err.to_string().contains("broken.conf"));
    }
}
