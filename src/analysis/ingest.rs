//! Survey payload validation.
//!
//! Turns the untyped backend document into a `SurveyResult`. A bad
//! top-level value fails the whole ingest; anything below that is
//! repaired or dropped with a `DataQualityWarning` so the rest of the
//! survey stays usable.

use super::aggregator::timestamp_warnings;
use crate::error::{json_type_name, DataQualityWarning, IngestError};
use crate::models::{DateBucket, Measurement, Section, SurveyResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Numeric channel keys, including the camelCase aliases `Measurement` accepts.
const CHANNEL_FIELDS: &[&str] = &[
    "average_brightness",
    "averageBrightness",
    "avgBrightness",
    "brightness_variation",
    "brightnessVariation",
    "shadow_percentage",
    "shadowPercentage",
];

/// An ingested survey plus the problems repaired along the way.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub survey: SurveyResult,
    pub warnings: Vec<DataQualityWarning>,
}

/// Validate a raw payload into a survey.
pub fn ingest(raw: &Value) -> Result<SurveyResult, IngestError> {
    ingest_report(raw).map(|report| report.survey)
}

/// Parse JSON text and ingest it.
pub fn ingest_str(text: &str) -> Result<IngestReport, IngestError> {
    let raw: Value = serde_json::from_str(text)?;
    ingest_report(&raw)
}

/// Validate a raw payload, keeping the list of data-quality warnings.
pub fn ingest_report(raw: &Value) -> Result<IngestReport, IngestError> {
    let sections = raw.as_object().ok_or(IngestError::InvalidShape {
        found: json_type_name(raw),
    })?;

    let mut report = IngestReport::default();

    for (key, value) in sections {
        match ingest_section(key, value, &mut report.warnings) {
            Some(section) => {
                report.survey.insert(key.clone(), section);
            }
            None => debug!("Skipping section '{}'", key),
        }
    }

    for section in report.survey.values() {
        report.warnings.extend(timestamp_warnings(section));
    }

    for warning in &report.warnings {
        warn!("{}", warning);
    }

    debug!(
        "Ingested {} sections with {} warnings",
        report.survey.len(),
        report.warnings.len()
    );

    Ok(report)
}

fn ingest_section(
    key: &str,
    value: &Value,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<Section> {
    let Some(object) = value.as_object() else {
        warnings.push(DataQualityWarning::MalformedSection {
            section: key.to_string(),
            reason: format!("expected an object, found {}", json_type_name(value)),
        });
        return None;
    };

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(key)
        .to_string();

    let dates = match object.get("dates") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(buckets)) => ingest_buckets(key, buckets, warnings),
        Some(other) => {
            warnings.push(DataQualityWarning::MalformedSection {
                section: key.to_string(),
                reason: format!("'dates' must be an object, found {}", json_type_name(other)),
            });
            return None;
        }
    };

    Some(Section { name, dates })
}

fn ingest_buckets(
    section: &str,
    buckets: &Map<String, Value>,
    warnings: &mut Vec<DataQualityWarning>,
) -> BTreeMap<String, DateBucket> {
    let mut dates = BTreeMap::new();

    for (date, value) in buckets {
        let Some(entries) = value.as_array() else {
            warnings.push(DataQualityWarning::MalformedBucket {
                section: section.to_string(),
                date: date.clone(),
            });
            continue;
        };

        let bucket = ingest_bucket(section, date, entries, warnings);
        dates.insert(date.clone(), bucket);
    }

    dates
}

fn ingest_bucket(
    section: &str,
    date: &str,
    entries: &[Value],
    warnings: &mut Vec<DataQualityWarning>,
) -> DateBucket {
    let mut bucket: DateBucket = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let entry = repair_channels(section, date, entry, warnings);
        let measurement: Measurement = match serde_json::from_value(entry) {
            Ok(m) => m,
            Err(e) => {
                warnings.push(DataQualityWarning::MalformedMeasurement {
                    section: section.to_string(),
                    date: date.to_string(),
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // Later records with the same image name replace earlier ones in place.
        let existing = if measurement.image_name.is_empty() {
            None
        } else {
            bucket
                .iter()
                .position(|m| m.image_name == measurement.image_name)
        };

        match existing {
            Some(pos) => {
                warnings.push(DataQualityWarning::DuplicateImageName {
                    section: section.to_string(),
                    date: date.to_string(),
                    image_name: measurement.image_name.clone(),
                });
                bucket[pos] = measurement;
            }
            None => bucket.push(measurement),
        }
    }

    bucket
}

/// Replace wrong-typed numeric channels with `null` so the rest of the
/// measurement is kept.
fn repair_channels(
    section: &str,
    date: &str,
    entry: &Value,
    warnings: &mut Vec<DataQualityWarning>,
) -> Value {
    let mut entry = entry.clone();

    if let Some(fields) = entry.as_object_mut() {
        let image_name = fields
            .get("image_name")
            .or_else(|| fields.get("imageName"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        for &field in CHANNEL_FIELDS {
            if let Some(value) = fields.get_mut(field) {
                if value.is_number() || value.is_null() {
                    continue;
                }
                warnings.push(DataQualityWarning::InvalidChannel {
                    section: section.to_string(),
                    date: date.to_string(),
                    image_name: image_name.clone(),
                    field: field.to_string(),
                    found: json_type_name(value),
                });
                *value = Value::Null;
            }
        }
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ingest_well_formed_survey() {
        let raw = json!({
            "North": {
                "name": "North (0°)",
                "dates": {
                    "2024-01-01": [
                        { "datetime": "2024-01-01T09:00:00", "image_name": "a.jpg", "average_brightness": 100.0 }
                    ]
                }
            }
        });

        let survey = ingest(&raw).unwrap();
        let north = &survey["North"];
        assert_eq!(north.name, "North (0°)");
        assert_eq!(north.dates["2024-01-01"].len(), 1);
    }

    #[test]
    fn test_top_level_array_is_invalid_shape() {
        let err = ingest(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, IngestError::InvalidShape { found: "array" }));
    }

    #[test]
    fn test_top_level_null_is_invalid_shape() {
        let err = ingest(&Value::Null).unwrap_err();
        assert!(matches!(err, IngestError::InvalidShape { found: "null" }));
    }

    #[test]
    fn test_malformed_section_dropped_others_kept() {
        let raw = json!({
            "Broken": 42,
            "BadDates": { "dates": [1, 2] },
            "South": { "dates": { "2024-02-01": [] } }
        });

        let report = ingest_report(&raw).unwrap();
        assert_eq!(report.survey.len(), 1);
        assert!(report.survey.contains_key("South"));
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .all(|w| matches!(w, DataQualityWarning::MalformedSection { .. })));
    }

    #[test]
    fn test_missing_dates_treated_as_empty() {
        let raw = json!({ "East": {}, "West": { "dates": null } });

        let survey = ingest(&raw).unwrap();
        assert!(survey["East"].dates.is_empty());
        assert!(survey["West"].dates.is_empty());
        assert_eq!(survey["East"].name, "East");
    }

    #[test]
    fn test_blank_name_falls_back_to_key() {
        let raw = json!({ "East": { "name": "  ", "dates": {} } });
        let survey = ingest(&raw).unwrap();
        assert_eq!(survey["East"].name, "East");
    }

    #[test]
    fn test_malformed_bucket_and_measurement_handled() {
        let raw = json!({
            "North": {
                "dates": {
                    "2024-01-01": "oops",
                    "2024-01-02": [
                        "not a measurement",
                        { "datetime": "2024-01-02T10:00", "image_name": "b.jpg", "average_brightness": "bright" },
                        { "datetime": "2024-01-02T11:00", "image_name": "c.jpg", "average_brightness": 90.0 }
                    ]
                }
            }
        });

        let report = ingest_report(&raw).unwrap();
        let north = &report.survey["North"];
        assert!(!north.dates.contains_key("2024-01-01"));

        let bucket = &north.dates["2024-01-02"];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].image_name, "b.jpg");
        assert_eq!(bucket[0].average_brightness, None);
        assert_eq!(bucket[0].captured_at, "2024-01-02T10:00");
        assert_eq!(bucket[1].image_name, "c.jpg");

        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings.contains(&DataQualityWarning::InvalidChannel {
            section: "North".to_string(),
            date: "2024-01-02".to_string(),
            image_name: "b.jpg".to_string(),
            field: "average_brightness".to_string(),
            found: "string",
        }));
    }

    #[test]
    fn test_invalid_channel_keeps_other_channels() {
        let raw = json!({
            "North": {
                "dates": {
                    "2024-01-01": [
                        { "datetime": "2024-01-01T09:00", "imageName": "a.jpg",
                          "avgBrightness": [1, 2], "shadowPercentage": 12.5,
                          "brightness_variation": null }
                    ]
                }
            }
        });

        let report = ingest_report(&raw).unwrap();
        let m = &report.survey["North"].dates["2024-01-01"][0];
        assert_eq!(m.average_brightness, None);
        assert_eq!(m.shadow_percentage, Some(12.5));
        assert_eq!(m.brightness_variation, None);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].to_string().contains("avgBrightness"));
    }

    #[test]
    fn test_non_string_timestamps_kept_and_ordered_first() {
        let raw = json!({
            "North": {
                "dates": {
                    "2024-01-01": [
                        { "datetime": null, "image_name": "null.jpg", "average_brightness": 1.0 },
                        { "datetime": 1704100000, "image_name": "epoch.jpg", "average_brightness": 2.0 },
                        { "datetime": "2024-01-01T09:00", "image_name": "ok.jpg", "average_brightness": 3.0 }
                    ]
                }
            }
        });

        let report = ingest_report(&raw).unwrap();
        let north = &report.survey["North"];

        let names: Vec<&str> = crate::analysis::flatten(north)
            .iter()
            .map(|t| t.measurement.image_name.as_str())
            .collect();
        assert_eq!(names, vec!["null.jpg", "epoch.jpg", "ok.jpg"]);

        let unparseable: Vec<&DataQualityWarning> = report
            .warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::UnparseableTimestamp { .. }))
            .collect();
        assert_eq!(unparseable.len(), 2);
        assert!(!report
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::MalformedMeasurement { .. })));
    }

    #[test]
    fn test_duplicate_image_name_replaces_in_place() {
        let raw = json!({
            "North": {
                "dates": {
                    "2024-01-01": [
                        { "datetime": "2024-01-01T09:00", "image_name": "a.jpg", "average_brightness": 1.0 },
                        { "datetime": "2024-01-01T10:00", "image_name": "b.jpg", "average_brightness": 2.0 },
                        { "datetime": "2024-01-01T09:00", "image_name": "a.jpg", "average_brightness": 3.0 }
                    ]
                }
            }
        });

        let report = ingest_report(&raw).unwrap();
        let bucket = &report.survey["North"].dates["2024-01-01"];
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].image_name, "a.jpg");
        assert_eq!(bucket[0].average_brightness, Some(3.0));
        assert!(matches!(
            report.warnings[0],
            DataQualityWarning::DuplicateImageName { .. }
        ));
    }

    #[test]
    fn test_ingest_str_rejects_bad_json() {
        let err = ingest_str("{ not json").unwrap_err();
        assert!(matches!(err, IngestError::Json(_)));
    }

    #[test]
    fn test_ingest_does_not_mutate_input() {
        let raw = json!({ "North": { "dates": { "2024-01-01": [ { "image_name": "a.jpg" } ] } } });
        let before = raw.clone();
        let _ = ingest(&raw).unwrap();
        assert_eq!(raw, before);
    }
}
