//! Roofsurvey - roof illumination survey reports
//!
//! Loads a survey from the analysis backend or a saved JSON file and
//! writes a Markdown or JSON report of the selected section.
//!
//! Exit codes:
//!   0 - Success (including a survey with no sections)
//!   1 - Runtime error (unreachable backend, invalid payload, config, I/O)

use anyhow::{Context, Result};
use roofsurvey::analysis;
use roofsurvey::cli::{Args, OutputFormat};
use roofsurvey::config::{Config, CONFIG_FILE_NAME};
use roofsurvey::models::{SectionSelection, SurveyResult};
use roofsurvey::report::{self, ReportOptions};
use roofsurvey::source::SurveySource;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so `general.verbose` can set the level
    let (mut config, config_error) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("roofsurvey v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_error {
        Some(e) => warn!("Failed to load config, using defaults: {:#}", e),
        None => debug!("Effective config: {:?}", config),
    }

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Survey load failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            eprintln!("   The survey could not be loaded. Check the source and try again.");
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .roofsurvey.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the backend URL, default section and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load, aggregate and report. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let source = SurveySource::resolve(args.input.clone(), &config.source);
    println!("📥 Loading survey: {}", source.describe());

    let raw = source.fetch(config.source.timeout_seconds).await?;
    let ingested = analysis::ingest_report(&raw).context("Survey payload rejected")?;
    let survey = &ingested.survey;

    info!(
        "Loaded {} sections ({} data-quality warnings)",
        survey.len(),
        ingested.warnings.len()
    );

    if args.list_sections {
        return handle_list_sections(survey);
    }

    let selection =
        analysis::resolve_section(survey, config.selection.default_section.as_deref());

    match selection {
        SectionSelection::Found { key, .. } => {
            if let Some(ref preferred) = config.selection.default_section {
                if preferred != key {
                    warn!("Section '{}' not found, showing '{}'", preferred, key);
                }
            }
            println!("📐 Section: {}", key);
        }
        SectionSelection::Empty => println!("📐 No sections in this survey"),
    }

    let options = ReportOptions {
        source: source.describe(),
        metric: config.selection.metric,
        include_series: config.report.include_series,
        backend: config.source.clone(),
    };
    let survey_report = report::build_report(survey, &ingested.warnings, selection, &options);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&survey_report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&survey_report, config.report.max_series_rows)
        }
    };

    let output_path = std::path::PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Survey Summary:");
    println!("   Sections: {}", survey_report.metadata.section_count);
    if let Some(ref view) = survey_report.selected {
        println!("   Measurements in {}: {}", view.name, view.trend.points);
        if let Some(ref url) = view.heat_map_url {
            println!("   Heat map: {}", url);
        }
    }
    if survey_report.metadata.warning_count > 0 {
        println!(
            "   ⚠️  Data quality warnings: {}",
            survey_report.metadata.warning_count
        );
    }
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(0)
}

/// Handle --list-sections: print the per-section summary, exit.
fn handle_list_sections(survey: &SurveyResult) -> Result<i32> {
    let summary = analysis::summarize(survey);

    if summary.is_empty() {
        println!("\n   No sections in this survey.");
        return Ok(0);
    }

    println!("\n   Found {} sections:\n", summary.len());
    for (name, s) in &summary {
        println!(
            "     📐 {} ({} days, {} measurements)",
            name, s.date_count, s.total_measurements
        );
        if !s.dates.is_empty() {
            println!("        Dates: {}", s.dates.join(", "));
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` must load. A broken default file falls back to
/// defaults; its error is returned for logging once tracing is up.
fn load_config(args: &Args) -> Result<(Config, Option<anyhow::Error>)> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path).map(|config| (config, None));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, None)),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => Ok((Config::default(), Some(e))),
    }
}
