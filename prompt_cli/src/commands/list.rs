use super::build_registry;
use anyhow::Result;
use colored::Colorize;
use prompt_core::RunnerSettings;
use std::path::PathBuf;

pub async fn execute(config: Vec<PathBuf>) -> Result<()> {
    println!("{}", "=== Registered Exporters ===".bold().cyan());

    let registry = build_registry(&config, &RunnerSettings::default()).await?;

    println!("\nTotal exporters: {}\n", registry.len());

    for exporter in registry.exporters() {
        println!("  {} {}", "•".green(), exporter.definition().description());
    }

    println!("\n{}", "Use 'prompt run <name>' to scrape a single exporter".yellow());

    Ok(())
}
