//! Tessdata command - download and inspect Tesseract language data.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

/// Arguments for the tessdata command.
#[derive(Args)]
pub struct TessdataArgs {
    #[command(subcommand)]
    command: TessdataCommand,
}

#[derive(Subcommand)]
enum TessdataCommand {
    /// Download a language model
    Download(DownloadArgs),

    /// Check which language models are present
    Status(StatusArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelQuality {
    /// Integer LSTM models - smaller and faster
    Fast,
    /// Float LSTM models - slower, slightly more accurate
    Best,
}

impl ModelQuality {
    fn repository(self) -> &'static str {
        match self {
            ModelQuality::Fast => "tessdata_fast",
            ModelQuality::Best => "tessdata_best",
        }
    }

    /// Smallest plausible size for a complete Spanish model.
    fn min_size_bytes(self) -> u64 {
        match self {
            ModelQuality::Fast => 1_000_000,
            ModelQuality::Best => 5_000_000,
        }
    }
}

#[derive(Args)]
struct DownloadArgs {
    /// Language code
    #[arg(short, long, default_value = "spa")]
    language: String,

    /// Model quality
    #[arg(short, long, value_enum, default_value = "fast")]
    quality: ModelQuality,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing model
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct StatusArgs {
    /// Directory to inspect
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

/// Directory `tessdata download` writes to.
pub fn default_tessdata_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("facturo")
        .join("tessdata")
}

/// Path of a language model inside a tessdata directory.
pub fn language_file(dir: &Path, language: &str) -> PathBuf {
    dir.join(format!("{}.traineddata", language))
}

fn model_url(quality: ModelQuality, language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/{}/raw/main/{}.traineddata",
        quality.repository(),
        language
    )
}

pub async fn run(args: TessdataArgs) -> anyhow::Result<()> {
    match args.command {
        TessdataCommand::Download(download_args) => download_model(download_args).await,
        TessdataCommand::Status(status_args) => check_status(status_args),
    }
}

async fn download_model(args: DownloadArgs) -> anyhow::Result<()> {
    let output_dir = args.output.unwrap_or_else(default_tessdata_dir);
    fs::create_dir_all(&output_dir)?;

    let path = language_file(&output_dir, &args.language);
    if path.exists() && !args.force {
        let size = fs::metadata(&path)?.len();
        if size >= args.quality.min_size_bytes() {
            println!(
                "{} {} already present ({})",
                style("✓").green(),
                path.display(),
                format_size(size)
            );
            return Ok(());
        }
    }

    println!(
        "{} Downloading {} ({}) to {}",
        style("ℹ").blue(),
        style(&args.language).cyan().bold(),
        args.quality.repository(),
        output_dir.display()
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("facturo-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} {msg:<20} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("=>-"),
    );
    pb.set_message(format!("{}.traineddata", args.language));

    let url = model_url(args.quality, &args.language);
    match download_file(&client, &url, &path, &pb).await {
        Ok(size) => {
            pb.finish_with_message(format!("{} {}", style("✓").green(), args.language));
            println!();
            println!(
                "{} Downloaded {} ({})",
                style("✓").green().bold(),
                path.display(),
                format_size(size)
            );
            println!(
                "{} Select the local backend with: facturo config set ocr.backend tesseract",
                style("ℹ").blue()
            );
            Ok(())
        }
        Err(e) => {
            pb.finish_with_message(format!("{} {} - {}", style("✗").red(), args.language, e));
            anyhow::bail!("Download of {} failed: {}", url, e)
        }
    }
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<u64> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    // Write to a temp file so an interrupted download never looks complete
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    Ok(downloaded)
}

fn check_status(args: StatusArgs) -> anyhow::Result<()> {
    let dir = args.dir.unwrap_or_else(default_tessdata_dir);

    println!("{}", style("Tesseract language data").bold());
    println!("Directory: {}", dir.display());
    println!();

    let mut models: Vec<(String, u64)> = Vec::new();
    if let Ok(entries) = fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "traineddata") {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                models.push((name, entry.metadata().map(|m| m.len()).unwrap_or(0)));
            }
        }
    }
    models.sort();

    if models.is_empty() {
        println!("    {} No language models found", style("✗").red());
        println!(
            "    {} Run 'facturo tessdata download' to fetch the Spanish model",
            style("⚠").yellow()
        );
        return Ok(());
    }

    for (name, size) in &models {
        let status = if *size >= ModelQuality::Fast.min_size_bytes() {
            style("✓").green()
        } else {
            style("⚠").yellow()
        };
        println!("    {} {:<12} {:>10}", status, name, format_size(*size));
    }

    if !models.iter().any(|(name, _)| name == "spa") {
        println!();
        println!(
            "    {} Spanish model missing. Run 'facturo tessdata download'",
            style("⚠").yellow()
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url() {
        assert_eq!(
            model_url(ModelQuality::Fast, "spa"),
            "https://github.com/tesseract-ocr/tessdata_fast/raw/main/spa.traineddata"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2_500_000), "2.5MB");
    }
}
