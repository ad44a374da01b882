//! Error and warning types for survey ingestion.
//!
//! `IngestError` is returned when a payload cannot be used at all.
//! `DataQualityWarning` describes a sub-record that was repaired or
//! dropped; warnings are logged and collected, never returned as `Err`.

use serde::Serialize;
use thiserror::Error;

/// Fatal ingestion failure.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The top-level payload is not a mapping of sections.
    #[error("invalid survey shape: expected an object of sections, found {found}")]
    InvalidShape { found: &'static str },

    /// The payload text is not valid JSON.
    #[error("survey payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal data problem found while ingesting or ordering a survey.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    #[error("section '{section}': unparseable timestamp '{captured_at}' on '{image_name}', ordered first")]
    UnparseableTimestamp {
        section: String,
        image_name: String,
        captured_at: String,
    },

    #[error("section '{section}' dropped: {reason}")]
    MalformedSection { section: String, reason: String },

    #[error("section '{section}', date '{date}': bucket dropped, expected a list of measurements")]
    MalformedBucket { section: String, date: String },

    #[error("section '{section}', date '{date}': measurement #{index} dropped: {reason}")]
    MalformedMeasurement {
        section: String,
        date: String,
        index: usize,
        reason: String,
    },

    #[error("section '{section}', date '{date}': '{field}' on '{image_name}' has type {found}, kept as no value")]
    InvalidChannel {
        section: String,
        date: String,
        image_name: String,
        field: String,
        found: &'static str,
    },

    #[error("section '{section}', date '{date}': duplicate image '{image_name}' replaced earlier record")]
    DuplicateImageName {
        section: String,
        date: String,
        image_name: String,
    },
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
