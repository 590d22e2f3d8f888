//! Process command - extract metadata from a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use facturo_core::{ExtractionReport, FacturoConfig, OcrPipeline};

use super::config::load_config;
use super::output::{format_report, OutputFormat};

/// Extensions accepted as invoice input.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image or scanned PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Recognition backend (overrides the configured one)
    #[arg(short, long)]
    backend: Option<String>,

    /// Include extraction strategies and warnings
    #[arg(long)]
    report: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(backend) = &args.backend {
        config.ocr.backend = backend.clone();
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args.input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Recognizing with {} backend...", config.ocr.backend));

    let data = fs::read(&args.input)?;
    let result = tokio::task::spawn_blocking(move || process_bytes(&config, &data)).await?;
    pb.finish_and_clear();
    let report = result?;

    if args.report && !report.warnings.is_empty() {
        eprintln!("{}", style("Extraction warnings:").yellow());
        for warning in &report.warnings {
            eprintln!("  - {}", warning);
        }
    }

    let output = format_report(&report, args.format, args.report)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Build a pipeline and run it on one document.
///
/// Runs on a blocking thread: the recognizers use blocking I/O and must be
/// created and dropped outside the async runtime.
pub fn process_bytes(config: &FacturoConfig, data: &[u8]) -> anyhow::Result<ExtractionReport> {
    let pipeline = OcrPipeline::from_config(config)?;
    Ok(pipeline.process_report(data)?)
}
