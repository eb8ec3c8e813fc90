//! Command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use review_harvest::application::{ReviewScraper, UrlStatus};
use review_harvest::infrastructure::config::{AppConfig, ExportFormat};
use review_harvest::infrastructure::logging;
use review_harvest::infrastructure::ChromeLauncher;

/// Scrape app store reviews into CSV, TSV or Excel files
#[derive(Debug, Parser)]
#[command(name = "review-harvest", version, about)]
struct Cli {
    /// Source URLs; replaces `sources` from the config file
    urls: Vec<String>,

    /// Config file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Export format, may be repeated
    #[arg(short, long = "format", value_enum)]
    formats: Vec<FormatArg>,

    /// Wait per field in milliseconds
    #[arg(long)]
    field_timeout_ms: Option<u64>,

    /// First position to extract (1-based)
    #[arg(long)]
    start_index: Option<u32>,

    /// Initial discovery stride
    #[arg(long)]
    stride: Option<u32>,

    /// Never probe beyond this position
    #[arg(long)]
    max_position: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Csv,
    Tsv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Tsv => ExportFormat::Tsv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if !self.urls.is_empty() {
            config.sources.clone_from(&self.urls);
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory.clone_from(dir);
        }
        if !self.formats.is_empty() {
            config.output.formats = self.formats.iter().map(|f| (*f).into()).collect();
        }
        if let Some(ms) = self.field_timeout_ms {
            config.extraction.field_timeout_ms = ms;
        }
        if self.start_index.is_some() {
            config.extraction.start_index = self.start_index;
        }
        if let Some(stride) = self.stride {
            config.discovery.initial_stride = stride;
        }
        if self.max_position.is_some() {
            config.discovery.max_position = self.max_position;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration after CLI overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_logging_with_config(&config.logging)?;
    logging::log_system_info();

    if config.sources.is_empty() {
        warn!("No source URLs given; nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, stopping after the current position");
            ctrl_c_token.cancel();
        }
    });

    let sources = config.sources.clone();
    let scraper = ReviewScraper::new(ChromeLauncher::new(config.browser.clone()), config);
    let reports = scraper.run(&sources, &cancel).await;

    let mut succeeded = 0usize;
    for report in &reports {
        match &report.status {
            UrlStatus::Completed {
                records,
                skipped,
                files,
                interrupted,
            } => {
                succeeded += 1;
                let suffix = if *interrupted { " (interrupted)" } else { "" };
                info!(
                    "✅ {}: {} reviews, {} positions skipped, {} file(s){}",
                    report.url,
                    records,
                    skipped,
                    files.len(),
                    suffix
                );
            }
            UrlStatus::Failed { kind, message } => {
                error!("❌ {}: {} ({})", report.url, message, kind);
            }
        }
    }

    if succeeded == 0 {
        error!("All {} source(s) failed", reports.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
