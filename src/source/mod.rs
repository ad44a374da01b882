//! Survey payload acquisition.
//!
//! Loads the raw survey document from a saved JSON file or from the
//! analysis backend. The payload is returned untyped; validation belongs to
//! `analysis::ingest`.

use crate::config::SourceConfig;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Where the survey document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveySource {
    /// A JSON file saved from the backend.
    File(PathBuf),
    /// The backend's full-survey endpoint.
    Http { base_url: String, endpoint: String },
}

impl SurveySource {
    /// Build the source from an optional input file and the backend settings.
    pub fn resolve(input: Option<PathBuf>, config: &SourceConfig) -> Self {
        match input {
            Some(path) => SurveySource::File(path),
            None => SurveySource::Http {
                base_url: config.backend_url.clone(),
                endpoint: config.survey_endpoint.clone(),
            },
        }
    }

    /// Human-readable location, used in report metadata.
    pub fn describe(&self) -> String {
        match self {
            SurveySource::File(path) => path.display().to_string(),
            SurveySource::Http { base_url, endpoint } => {
                join_url(base_url, &[endpoint.as_str()])
            }
        }
    }

    /// Fetch the raw survey document.
    pub async fn fetch(&self, timeout_seconds: u64) -> Result<Value> {
        match self {
            SurveySource::File(path) => {
                info!("Reading survey from {}", path.display());
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read survey file: {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Survey file is not valid JSON: {}", path.display()))
            }
            SurveySource::Http { .. } => {
                let url = self.describe();
                info!("Fetching survey from {}", url);

                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(timeout_seconds))
                    .build()
                    .context("Failed to create HTTP client")?;

                let response = client
                    .get(&url)
                    .send()
                    .await
                    .with_context(|| format!("Failed to reach survey backend at {}", url))?;

                let status = response.status();
                if !status.is_success() {
                    bail!("Survey backend returned {} for {}", status, url);
                }

                debug!("Survey response status: {}", status);

                response
                    .json::<Value>()
                    .await
                    .with_context(|| format!("Survey response from {} is not valid JSON", url))
            }
        }
    }
}

/// URL of a heat-map asset on the backend. The asset itself is not fetched.
pub fn heat_map_url(config: &SourceConfig, reference: &str) -> String {
    join_url(
        &config.backend_url,
        &[config.heat_map_endpoint.as_str(), reference],
    )
}

/// Join URL parts with exactly one `/` between each.
fn join_url(base: &str, parts: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for part in parts {
        let part = part.trim_matches('/');
        if part.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(part);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_input_file() {
        let config = SourceConfig::default();
        let source = SurveySource::resolve(Some(PathBuf::from("survey.json")), &config);
        assert_eq!(source, SurveySource::File(PathBuf::from("survey.json")));

        let remote = SurveySource::resolve(None, &config);
        assert_eq!(remote.describe(), "http://localhost:5000/api/illumination");
    }

    #[test]
    fn test_heat_map_url() {
        let config = SourceConfig {
            backend_url: "http://localhost:5000/".to_string(),
            ..SourceConfig::default()
        };
        assert_eq!(
            heat_map_url(&config, "North_2024-01-01-09-00_heat_map.npy"),
            "http://localhost:5000/api/heatmap/North_2024-01-01-09-00_heat_map.npy"
        );
    }

    #[test]
    fn test_join_url_slashes() {
        assert_eq!(join_url("http://a", &["/x/", "y"]), "http://a/x/y");
        assert_eq!(join_url("http://a/", &["", "y"]), "http://a/y");
    }

    #[test]
    fn test_fetch_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, r#"{"North": {"dates": {}}}"#).unwrap();

        let source = SurveySource::File(path);
        let value = tokio_test::block_on(source.fetch(5)).unwrap();
        assert!(value.get("North").is_some());
    }

    #[test]
    fn test_fetch_from_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, "not json").unwrap();

        let source = SurveySource::File(path);
        assert!(tokio_test::block_on(source.fetch(5)).is_err());
    }

    #[test]
    fn test_fetch_missing_file() {
        let source = SurveySource::File(PathBuf::from("/no/such/survey.json"));
        assert!(tokio_test::block_on(source.fetch(5)).is_err());
    }
}
