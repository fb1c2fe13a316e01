//! Command-line arguments and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pipeline::PipelineConfig;

use crate::observability::LogFormat;

/// Relay - feed interactive requests through a fetch → classify → report pipeline
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip the configured bootstrap requests
    #[arg(long)]
    pub no_bootstrap: bool,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export (e.g. http://localhost:4317)
    #[arg(long)]
    pub otlp_endpoint: Option<String>,
}

impl Cli {
    /// Resolve the effective pipeline configuration.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineConfig::default(),
        };
        if self.no_bootstrap {
            config.bootstrap.clear();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Read and parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

/// Parse configuration from TOML text. Missing keys take their defaults.
pub fn parse_config(raw: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
