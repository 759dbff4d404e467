mod commands;
mod server;
mod ui;

use clap::{Args, Parser, Subcommand, ValueEnum};
use prompt_core::{DEFAULT_MAX_CONCURRENCY, DEFAULT_SHELL};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "prompt")]
#[command(about = "Serve the output of many metric scripts from a single scrape endpoint", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration file name. If a directory, reads all files ending with .conf.
    /// May be specified multiple times.
    #[arg(short, long = "config", required = true, value_name = "FILE|DIR")]
    config: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve aggregated exporter output over HTTP
    Serve {
        /// Listen address
        #[arg(short, long, env = "PROMPT_LISTEN", value_name = "HOST[:PORT]")]
        listen: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Maximum number of exporters run at the same time per scrape
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY, value_parser = parse_concurrency)]
        max_concurrency: usize,

        /// Deadline for exporters that do not set their own timeout
        #[arg(long, value_parser = humantime::parse_duration)]
        probe_timeout: Option<Duration>,

        /// Shell used to interpret exporter commands
        #[arg(long, default_value = DEFAULT_SHELL)]
        shell: String,
    },

    /// Validate configuration files
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List the exporters that would be registered
    List {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Scrape a single exporter once and print its output
    Run {
        /// Exporter name
        name: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Deadline for the exporter if it does not set its own timeout
        #[arg(long, value_parser = humantime::parse_duration)]
        probe_timeout: Option<Duration>,

        /// Shell used to interpret the exporter command
        #[arg(long, default_value = DEFAULT_SHELL)]
        shell: String,
    },
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    match cli.command {
        Commands::Serve {
            listen,
            config,
            max_concurrency,
            probe_timeout,
            shell,
        } => {
            commands::serve::execute(listen, config.config, max_concurrency, probe_timeout, shell)
                .await?;
        }

        Commands::Validate { config } => {
            commands::validate::execute(config.config).await?;
        }

        Commands::List { config } => {
            commands::list::execute(config.config).await?;
        }

        Commands::Run {
            name,
            config,
            probe_timeout,
            shell,
        } => {
            commands::run::execute(name, config.config, probe_timeout, shell).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::try_parse_from([
            "prompt", "serve", "-l", ":9100", "-c", "a.conf", "-c", "conf.d", "--probe-timeout", "15s",
        ])
        .unwrap();

        let Commands::Serve {
            listen,
            config,
            max_concurrency,
            probe_timeout,
            shell,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(listen, ":9100");
        assert_eq!(config.config.len(), 2);
        assert_eq!(max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(probe_timeout, Some(Duration::from_secs(15)));
        assert_eq!(shell, "sh");
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let result = Cli::try_parse_from([
            "prompt", "serve", "-l", ":9100", "-c", "a.conf", "--max-concurrency", "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["prompt", "list"]).is_err());
    }
}
