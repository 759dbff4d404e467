use crate::ui;
use anyhow::Result;
use colored::Colorize;
use prompt_config::load_config;
use std::path::PathBuf;

pub async fn execute(config: Vec<PathBuf>) -> Result<()> {
    ui::print_header("Validating Configuration");
    for source in &config {
        println!("Source: {}", source.display());
    }

    match load_config(&config).await {
        Ok(config) => {
            println!("\n{}", "✓ Configuration is valid!".green().bold());
            println!("\nExporters: {}", config.exporters.len());

            if config.exporters.is_empty() {
                ui::print_warning("No exporters configured; /metrics will answer 204");
            }

            for (i, exporter) in config.exporters.iter().enumerate() {
                println!("\n  Exporter {}: {}", i + 1, exporter.name);
                println!("    Command: {}", exporter.command);
                if let Some(interval) = exporter.min_interval {
                    println!("    Min interval: {}", humantime::format_duration(interval));
                }
                if let Some(timeout) = exporter.timeout {
                    println!("    Timeout: {}", humantime::format_duration(timeout));
                }
            }

            for name in config.duplicate_names() {
                ui::print_warning(&format!(
                    "Exporter {:?} is defined more than once; only the first definition is used",
                    name
                ));
            }

            Ok(())
        }
        Err(e) => {
            println!("\n{}", "✗ Configuration is invalid!".red().bold());
            println!("\nError: {:#}", e);
            Err(e)
        }
    }
}
