//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Metric;
use clap::Parser;
use std::path::PathBuf;

/// Roofsurvey - roof illumination survey reports
///
/// Loads a survey from the analysis backend (or a saved JSON file),
/// orders every section's measurements chronologically and writes a
/// Markdown or JSON report.
///
/// Examples:
///   roofsurvey --url http://localhost:5000
///   roofsurvey --input survey.json --section North --format json
///   roofsurvey --input survey.json --list-sections
///   roofsurvey --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Read the survey from a saved JSON file instead of the backend
    #[arg(short, long, value_name = "FILE", conflicts_with = "url")]
    pub input: Option<PathBuf>,

    /// Analysis backend base URL
    ///
    /// Overrides `source.backend_url` from the config file.
    #[arg(short, long, value_name = "URL", env = "ROOFSURVEY_URL")]
    pub url: Option<String>,

    /// Section to report on
    ///
    /// Falls back to `selection.default_section`, then to the first
    /// section in name order.
    #[arg(short, long, value_name = "NAME")]
    pub section: Option<String>,

    /// Metric used for the trend line
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<Metric>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .roofsurvey.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Omit the per-measurement series table
    #[arg(long)]
    pub no_series: bool,

    /// Print the per-section summary and exit
    #[arg(long)]
    pub list_sections: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .roofsurvey.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Backend URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over a config file asking for verbose output.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
