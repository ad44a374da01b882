//! Measurement flattening and derived views.
//!
//! Every display surface consumes the output of these functions instead of
//! flattening and sorting the date buckets itself. All functions are pure:
//! they borrow the survey and return fresh structures.

use crate::error::DataQualityWarning;
use crate::models::{
    Metric, MultiMetricPoint, Section, SectionSelection, SectionSummary, SeriesPoint,
    SurveyResult, TimedMeasurement,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d-%H-%M",
];

/// Parse a backend capture timestamp.
///
/// Offsets are normalized to UTC. A bare date means midnight.
pub fn parse_captured_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Merge all date buckets of a section into one chronological sequence.
///
/// The sort is stable. Unparseable timestamps order first; `ingest_report`
/// reports them as warnings, here they are only traced.
pub fn flatten(section: &Section) -> Vec<TimedMeasurement<'_>> {
    let mut timed: Vec<TimedMeasurement<'_>> = section
        .dates
        .values()
        .flatten()
        .map(|measurement| {
            let at = parse_captured_at(&measurement.captured_at);
            if at.is_none() {
                debug!(
                    "Ordering '{}' in '{}' first: unparseable timestamp '{}'",
                    measurement.image_name, section.name, measurement.captured_at
                );
            }
            TimedMeasurement { at, measurement }
        })
        .collect();

    timed.sort_by_key(|t| t.at);
    timed
}

/// Collect the unparseable-timestamp warnings for a section without logging.
pub fn timestamp_warnings(section: &Section) -> Vec<DataQualityWarning> {
    section
        .dates
        .values()
        .flatten()
        .filter(|m| parse_captured_at(&m.captured_at).is_none())
        .map(|m| DataQualityWarning::UnparseableTimestamp {
            section: section.name.clone(),
            image_name: m.image_name.clone(),
            captured_at: m.captured_at.clone(),
        })
        .collect()
}

/// Time series of one metric, in `flatten` order.
pub fn derive_single_metric_series(section: &Section, metric: Metric) -> Vec<SeriesPoint> {
    single_metric_points(&flatten(section), metric)
}

/// All three metrics aligned by index, in `flatten` order.
///
/// Missing channels stay `None`.
pub fn derive_multi_metric_series(section: &Section) -> Vec<MultiMetricPoint> {
    multi_metric_points(&flatten(section))
}

/// One-metric series over an already flattened section.
pub fn single_metric_points(flat: &[TimedMeasurement<'_>], metric: Metric) -> Vec<SeriesPoint> {
    flat.iter()
        .map(|t| SeriesPoint {
            captured_at: t.measurement.captured_at.clone(),
            timestamp: t.at,
            value: metric.value_of(t.measurement),
        })
        .collect()
}

/// Three-metric series over an already flattened section.
pub fn multi_metric_points(flat: &[TimedMeasurement<'_>]) -> Vec<MultiMetricPoint> {
    flat.iter()
        .map(|t| MultiMetricPoint {
            captured_at: t.measurement.captured_at.clone(),
            timestamp: t.at,
            average_brightness: t.measurement.average_brightness,
            brightness_variation: t.measurement.brightness_variation,
            shadow_percentage: t.measurement.shadow_percentage,
        })
        .collect()
}

/// Per-section date and measurement counts.
pub fn summarize(survey: &SurveyResult) -> BTreeMap<String, SectionSummary> {
    survey
        .iter()
        .map(|(key, section)| (key.clone(), summarize_section(section)))
        .collect()
}

fn summarize_section(section: &Section) -> SectionSummary {
    let flat = flatten(section);

    SectionSummary {
        date_count: section.dates.len(),
        total_measurements: flat.len(),
        dates: section.dates.keys().cloned().collect(),
        first_capture: flat.first().map(|t| t.measurement.captured_at.clone()),
        last_capture: flat.last().map(|t| t.measurement.captured_at.clone()),
    }
}

/// Pick the section to display.
///
/// Prefers `preferred` when present, then the lexicographically first
/// section, then `Empty`.
pub fn resolve_section<'a>(
    survey: &'a SurveyResult,
    preferred: Option<&str>,
) -> SectionSelection<'a> {
    if let Some(name) = preferred {
        if let Some((key, section)) = survey.get_key_value(name) {
            return SectionSelection::Found {
                key: key.as_str(),
                section,
            };
        }
    }

    match survey.iter().next() {
        Some((key, section)) => SectionSelection::Found {
            key: key.as_str(),
            section,
        },
        None => SectionSelection::Empty,
    }
}

/// Heat-map reference of the chronologically first measurement.
pub fn resolve_heat_map_ref(section: &Section) -> Option<&str> {
    first_heat_map_ref(&flatten(section))
}

/// Heat-map reference of the first entry of an already flattened section.
pub fn first_heat_map_ref<'a>(flat: &[TimedMeasurement<'a>]) -> Option<&'a str> {
    flat.first().and_then(|t| t.measurement.heat_map())
}
