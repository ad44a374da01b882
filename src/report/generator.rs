//! Survey report generation.
//!
//! Builds the serializable `SurveyReport` from the aggregator's views and
//! renders it as Markdown or JSON. Series arrive already ordered and are
//! rendered as-is.

use crate::analysis::{
    first_heat_map_ref, flatten, multi_metric_points, single_metric_points, summarize,
};
use crate::config::SourceConfig;
use crate::error::DataQualityWarning;
use crate::models::{
    Metric, MultiMetricPoint, ReportMetadata, SectionSelection, SectionSummary, SectionView,
    SurveyReport, SurveyResult, TrendSummary,
};
use crate::source::heat_map_url;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// Inputs that shape a report beyond the survey itself.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Where the survey was loaded from.
    pub source: String,
    /// Metric used for the trend line.
    pub metric: Metric,
    /// Include the three-channel series.
    pub include_series: bool,
    /// Backend settings, used for heat-map URLs.
    pub backend: SourceConfig,
}

/// Assemble the report for a survey and its selected section.
///
/// `ingest_warnings` are reported as given; `ingest_report` already
/// includes the unparseable-timestamp warnings.
pub fn build_report(
    survey: &SurveyResult,
    ingest_warnings: &[DataQualityWarning],
    selection: SectionSelection<'_>,
    options: &ReportOptions,
) -> SurveyReport {
    let summary = summarize(survey);

    let warnings: Vec<String> = ingest_warnings.iter().map(ToString::to_string).collect();

    let selected = match selection {
        SectionSelection::Found { key, section } => {
            debug!("Building view for section '{}'", key);

            let flat = flatten(section);
            let series = single_metric_points(&flat, options.metric);
            let heat_map_ref = first_heat_map_ref(&flat).map(str::to_string);

            Some(SectionView {
                key: key.to_string(),
                name: section.name.clone(),
                heat_map_url: heat_map_ref
                    .as_deref()
                    .map(|r| heat_map_url(&options.backend, r)),
                heat_map_ref,
                trend: TrendSummary::from_series(options.metric, &series),
                series,
                metrics: if options.include_series {
                    multi_metric_points(&flat)
                } else {
                    Vec::new()
                },
            })
        }
        SectionSelection::Empty => None,
    };

    SurveyReport {
        metadata: ReportMetadata {
            source: options.source.clone(),
            generated_at: Utc::now(),
            section_count: survey.len(),
            warning_count: warnings.len(),
        },
        summary,
        selected,
        warnings,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SurveyReport, max_series_rows: usize) -> String {
    let mut output = String::new();

    output.push_str("# Roof Illumination Survey\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));

    match report.selected {
        Some(ref view) => output.push_str(&generate_section_view(view, max_series_rows)),
        None => output.push_str("## Section\n\nNo section data available.\n\n"),
    }

    output.push_str(&generate_warnings_section(&report.warnings));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Sections:** {}\n", metadata.section_count));
    if metadata.warning_count > 0 {
        section.push_str(&format!(
            "- **Data Quality Warnings:** {}\n",
            metadata.warning_count
        ));
    }
    section.push('\n');

    section
}

/// Generate the cross-section comparison table.
fn generate_summary_section(summary: &BTreeMap<String, SectionSummary>) -> String {
    let mut section = String::new();

    section.push_str("## Sections\n\n");

    if summary.is_empty() {
        section.push_str("No sections in this survey.\n\n");
        return section;
    }

    section.push_str("| Section | Days | Measurements | First Capture | Last Capture |\n");
    section.push_str("|:---|:---:|:---:|:---|:---|\n");

    for (name, s) in summary {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            name,
            s.date_count,
            s.total_measurements,
            s.first_capture.as_deref().unwrap_or("–"),
            s.last_capture.as_deref().unwrap_or("–"),
        ));
    }
    section.push('\n');

    section
}

/// Generate the selected section: heat map, trend and series table.
fn generate_section_view(view: &SectionView, max_series_rows: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Section: {}\n\n", view.name));

    match (&view.heat_map_ref, &view.heat_map_url) {
        (Some(reference), Some(url)) => {
            section.push_str(&format!("**Heat Map:** [{}]({})\n\n", reference, url));
        }
        (Some(reference), None) => {
            section.push_str(&format!("**Heat Map:** `{}`\n\n", reference));
        }
        _ => section.push_str("**Heat Map:** none\n\n"),
    }

    let trend = &view.trend;
    section.push_str(&format!(
        "**Trend ({}):** {} points, first {}, last {}, min {}, max {}\n\n",
        trend.metric,
        trend.points,
        format_value(trend.first),
        format_value(trend.last),
        format_value(trend.min),
        format_value(trend.max),
    ));

    if !view.metrics.is_empty() {
        section.push_str(&generate_series_table(&view.metrics, max_series_rows));
    }

    section
}

/// Generate the three-channel series table.
fn generate_series_table(points: &[MultiMetricPoint], max_rows: usize) -> String {
    let mut table = String::new();

    table.push_str("### Measurements\n\n");
    table.push_str("| Captured | Avg Brightness | Brightness Variation | Shadow % |\n");
    table.push_str("|:---|---:|---:|---:|\n");

    for point in points.iter().take(max_rows) {
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.captured_at,
            format_value(point.average_brightness),
            format_value(point.brightness_variation),
            format_value(point.shadow_percentage),
        ));
    }

    if points.len() > max_rows {
        table.push_str(&format!(
            "\n*{} more measurements omitted.*\n",
            points.len() - max_rows
        ));
    }
    table.push('\n');

    table
}

/// Generate the data-quality section.
fn generate_warnings_section(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    for warning in warnings {
        section.push_str(&format!("- {}\n", warning));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by roofsurvey v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "–".to_string(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SurveyReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
