pub mod list;
pub mod run;
pub mod serve;
pub mod validate;

use anyhow::Result;
use prompt_config::load_config;
use prompt_core::{ExporterRegistry, RunnerSettings};
use std::path::PathBuf;

pub(crate) async fn build_registry(
    sources: &[PathBuf],
    settings: &RunnerSettings,
) -> Result<ExporterRegistry> {
    let config = load_config(sources).await?;
    Ok(ExporterRegistry::from_definitions(config.definitions(), settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_registry_skips_duplicates_across_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.conf"),
            "exporters:\n  - name: up\n    command: echo up 1\n    minInterval: 10\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.conf"),
            "exporters:\n  - name: up\n    command: echo up 2\n  - name: load\n    command: echo load 1\n",
        )
        .unwrap();

        let registry = build_registry(&[dir.path().to_path_buf()], &RunnerSettings::default())
            .await
            .unwrap();

        assert_eq!(registry.list(), vec!["up", "load"]);
        let up = registry.get("up").unwrap().definition();
        assert_eq!(up.command, "echo up 1");
        assert_eq!(up.min_interval, Some(std::time::Duration::from_secs(10)));
    }
}
