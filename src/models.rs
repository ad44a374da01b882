//! Data models for roof illumination surveys.
//!
//! This module contains the ingested survey records and the derived
//! views (series, summaries, selections) built from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One photo's analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Capture date-time as supplied by the backend (unparsed).
    #[serde(
        rename = "datetime",
        alias = "capturedAt",
        alias = "captured_at",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub captured_at: String,
    /// Photo file name, unique within its date bucket.
    #[serde(alias = "imageName", default)]
    pub image_name: String,
    /// Mean pixel brightness.
    #[serde(alias = "averageBrightness", alias = "avgBrightness", default)]
    pub average_brightness: Option<f64>,
    /// Standard deviation of pixel brightness.
    #[serde(alias = "brightnessVariation", default)]
    pub brightness_variation: Option<f64>,
    /// Share of shadowed pixels, in percent.
    #[serde(alias = "shadowPercentage", default)]
    pub shadow_percentage: Option<f64>,
    /// Reference to the derived heat-map artifact.
    #[serde(
        rename = "heat_map_file",
        alias = "heatMapRef",
        alias = "heat_map_ref",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub heat_map_ref: Option<String>,
}

impl Measurement {
    /// Heat-map reference, treating an empty string as absent.
    pub fn heat_map(&self) -> Option<&str> {
        self.heat_map_ref.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// Keep any scalar timestamp as text so it survives to ordering. `null` is empty.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Measurements captured on one calendar date.
pub type DateBucket = Vec<Measurement>;

/// A named roof facet with its date buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Display label.
    pub name: String,
    /// Date key to measurements captured that day.
    #[serde(default)]
    pub dates: BTreeMap<String, DateBucket>,
}

impl Section {
    /// Number of measurements across every bucket.
    pub fn measurement_count(&self) -> usize {
        self.dates.values().map(Vec::len).sum()
    }
}

/// Every section of a survey, keyed by section name.
pub type SurveyResult = BTreeMap<String, Section>;

/// A numeric channel of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    #[default]
    AverageBrightness,
    BrightnessVariation,
    ShadowPercentage,
}

impl Metric {
    /// Reads this channel from a measurement.
    pub fn value_of(&self, measurement: &Measurement) -> Option<f64> {
        match self {
            Metric::AverageBrightness => measurement.average_brightness,
            Metric::BrightnessVariation => measurement.brightness_variation,
            Metric::ShadowPercentage => measurement.shadow_percentage,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::AverageBrightness => write!(f, "Average brightness"),
            Metric::BrightnessVariation => write!(f, "Brightness variation"),
            Metric::ShadowPercentage => write!(f, "Shadow percentage"),
        }
    }
}

/// A measurement paired with its parsed capture time.
///
/// `at` is `None` when `captured_at` could not be parsed; such records
/// order before every parsed one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedMeasurement<'a> {
    pub at: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub measurement: &'a Measurement,
}

/// One point of a single-metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub captured_at: String,
    pub timestamp: Option<NaiveDateTime>,
    pub value: Option<f64>,
}

/// One point of the aligned three-channel series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMetricPoint {
    pub captured_at: String,
    pub timestamp: Option<NaiveDateTime>,
    pub average_brightness: Option<f64>,
    pub brightness_variation: Option<f64>,
    pub shadow_percentage: Option<f64>,
}

/// Per-section counts for the cross-section comparison view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    /// Date keys present, empty buckets included.
    pub date_count: usize,
    /// Measurements across all buckets.
    pub total_measurements: usize,
    /// Date keys in sorted order.
    pub dates: Vec<String>,
    /// Raw capture time of the chronologically first measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_capture: Option<String>,
    /// Raw capture time of the chronologically last measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_capture: Option<String>,
}

/// Outcome of choosing which section to display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionSelection<'a> {
    /// A section was found, with the key it is stored under.
    Found { key: &'a str, section: &'a Section },
    /// The survey has no sections. Render as "no data".
    Empty,
}

impl<'a> SectionSelection<'a> {
    /// The selected section, if any.
    pub fn section(&self) -> Option<&'a Section> {
        match self {
            SectionSelection::Found { section, .. } => Some(section),
            SectionSelection::Empty => None,
        }
    }

    /// Whether there is nothing to display.
    pub fn is_empty(&self) -> bool {
        matches!(self, SectionSelection::Empty)
    }
}

/// First/last/extreme values of a single-metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub metric: Metric,
    /// Number of points, including those without a value.
    pub points: usize,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl TrendSummary {
    /// Summarizes a series, skipping points without a value.
    pub fn from_series(metric: Metric, series: &[SeriesPoint]) -> Self {
        let values: Vec<f64> = series.iter().filter_map(|p| p.value).collect();

        Self {
            metric,
            points: series.len(),
            first: values.first().copied(),
            last: values.last().copied(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

/// Everything a display surface needs for one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    /// Key the section is stored under in the survey.
    pub key: String,
    /// Display label.
    pub name: String,
    /// Heat map of the chronologically first measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_map_ref: Option<String>,
    /// Backend URL of that heat map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_map_url: Option<String>,
    pub trend: TrendSummary,
    /// Selected-metric series.
    pub series: Vec<SeriesPoint>,
    /// Three-channel series; empty when series output is disabled.
    pub metrics: Vec<MultiMetricPoint>,
}

/// Metadata about the survey report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// File path or URL the survey was loaded from.
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of usable sections.
    pub section_count: usize,
    /// Number of data-quality warnings.
    pub warning_count: usize,
}

/// The complete survey report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyReport {
    pub metadata: ReportMetadata,
    /// Per-section counts, keyed by section key.
    pub summary: BTreeMap<String, SectionSummary>,
    /// The displayed section, or `None` when the survey is empty.
    pub selected: Option<SectionView>,
    /// Data-quality warnings as readable text.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trend_summary_skips_missing_values() {
        let point = |value: Option<f64>| SeriesPoint {
            captured_at: String::new(),
            timestamp: None,
            value,
        };
        let series = vec![point(None), point(Some(5.0)), point(Some(2.0)), point(None)];

        let trend = TrendSummary::from_series(Metric::AverageBrightness, &series);
        assert_eq!(trend.points, 4);
        assert_eq!(trend.first, Some(5.0));
        assert_eq!(trend.last, Some(2.0));
        assert_eq!(trend.min, Some(2.0));
        assert_eq!(trend.max, Some(5.0));

        let empty = TrendSummary::from_series(Metric::AverageBrightness, &[]);
        assert_eq!(empty.first, None);
        assert_eq!(empty.max, None);
    }

    #[test]
    fn test_measurement_backend_field_names() {
        let m: Measurement = serde_json::from_value(json!({
            "datetime": "2024-01-01T09:00:00",
            "image_name": "2024-01-01-09-00.jpg",
            "average_brightness": 101.5,
            "brightness_variation": 12.0,
            "shadow_percentage": 33.3,
            "heat_map_file": "North_2024-01-01-09-00_heat_map.npy"
        }))
        .unwrap();

        assert_eq!(m.captured_at, "2024-01-01T09:00:00");
        assert_eq!(m.average_brightness, Some(101.5));
        assert_eq!(m.heat_map(), Some("North_2024-01-01-09-00_heat_map.npy"));
    }

    #[test]
    fn test_measurement_camel_case_aliases() {
        let m: Measurement = serde_json::from_value(json!({
            "capturedAt": "2024-01-02T10:00",
            "avgBrightness": 120.0,
            "heatMapRef": "h1.png"
        }))
        .unwrap();

        assert_eq!(m.captured_at, "2024-01-02T10:00");
        assert_eq!(m.average_brightness, Some(120.0));
        assert_eq!(m.brightness_variation, None);
        assert_eq!(m.heat_map(), Some("h1.png"));
    }

    #[test]
    fn test_non_string_timestamp_kept_as_text() {
        let null: Measurement =
            serde_json::from_value(json!({ "datetime": null, "image_name": "a.jpg" })).unwrap();
        assert_eq!(null.captured_at, "");

        let epoch: Measurement =
            serde_json::from_value(json!({ "datetime": 1704100000, "image_name": "b.jpg" }))
                .unwrap();
        assert_eq!(epoch.captured_at, "1704100000");

        let missing: Measurement = serde_json::from_value(json!({ "image_name": "c.jpg" })).unwrap();
        assert_eq!(missing.captured_at, "");
    }

    #[test]
    fn test_empty_heat_map_is_absent() {
        let m: Measurement = serde_json::from_value(json!({ "heat_map_file": "" })).unwrap();
        assert_eq!(m.heat_map(), None);
    }

    #[test]
    fn test_metric_value_of() {
        let m = Measurement {
            captured_at: String::new(),
            image_name: "a.jpg".to_string(),
            average_brightness: Some(1.0),
            brightness_variation: Some(2.0),
            shadow_percentage: None,
            heat_map_ref: None,
        };
        assert_eq!(Metric::AverageBrightness.value_of(&m), Some(1.0));
        assert_eq!(Metric::BrightnessVariation.value_of(&m), Some(2.0));
        assert_eq!(Metric::ShadowPercentage.value_of(&m), None);
    }

    #[test]
    fn test_section_measurement_count() {
        let mut section = Section {
            name: "North".to_string(),
            dates: BTreeMap::new(),
        };
        section.dates.insert("2024-01-01".to_string(), vec![]);
        assert_eq!(section.measurement_count(), 0);
    }

    #[test]
    fn test_selection_empty() {
        let selection = SectionSelection::Empty;
        assert!(selection.is_empty());
        assert!(selection.section().is_none());
    }
}
