//! Roofsurvey - roof illumination survey aggregation
//!
//! Normalizes the backend's nested survey document (section → date →
//! measurements) into chronologically ordered series, per-section summaries
//! and section/heat-map selections that every display surface consumes.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod source;

pub use analysis::{
    derive_multi_metric_series, derive_single_metric_series, first_heat_map_ref, flatten, ingest,
    ingest_report, multi_metric_points, resolve_heat_map_ref, resolve_section,
    single_metric_points, summarize, IngestReport,
};
pub use error::{DataQualityWarning, IngestError};
pub use models::{
    Measurement, Metric, MultiMetricPoint, Section, SectionSelection, SectionSummary,
    SeriesPoint, SurveyResult, TimedMeasurement,
};
