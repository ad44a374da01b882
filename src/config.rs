//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.roofsurvey.toml` files.

use crate::models::Metric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".roofsurvey.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Survey backend settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Section and metric selection.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "roof_survey_report.md".to_string()
}

/// Survey backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Backend base URL.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Path of the full-survey endpoint.
    #[serde(default = "default_survey_endpoint")]
    pub survey_endpoint: String,

    /// Path under which heat-map assets are served.
    #[serde(default = "default_heat_map_endpoint")]
    pub heat_map_endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            survey_endpoint: default_survey_endpoint(),
            heat_map_endpoint: default_heat_map_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_survey_endpoint() -> String {
    "/api/illumination".to_string()
}

fn default_heat_map_endpoint() -> String {
    "/api/heatmap".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Which section and metric to show when the CLI does not say.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Preferred section name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_section: Option<String>,

    /// Metric used for the trend line.
    #[serde(default)]
    pub metric: Metric,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the per-measurement series table.
    #[serde(default = "default_true")]
    pub include_series: bool,

    /// Maximum series rows rendered in Markdown.
    #[serde(default = "default_max_series_rows")]
    pub max_series_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_series: true,
            max_series_rows: default_max_series_rows(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_series_rows() -> usize {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.source.backend_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(ref section) = args.section {
            self.selection.default_section = Some(section.clone());
        }
        if let Some(metric) = args.metric {
            self.selection.metric = metric;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if args.no_series {
            self.report.include_series = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
