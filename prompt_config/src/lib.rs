pub mod config;
pub mod parser;

pub use config::{Config, ConfigBuilder, ExporterConfig};
pub use parser::{load_config, parse_config_from_file, parse_config_from_str};
