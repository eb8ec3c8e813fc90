//! Per-URL orchestration
//!
//! Runs one pass per source URL: launch a session, navigate, open the review
//! list, establish the position bound, extract, export. Each pass owns its
//! session, bound and sink; a session fault fails that URL only.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::domain::{ReviewSink, SessionDriver, SessionLauncher};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::extraction_error::ExtractionResult;
use crate::infrastructure::record_export::RecordExporter;
use crate::infrastructure::source_profiles::{BoundStrategy, ClickAction, SourceProfile};

use super::discovery_service::{AdaptiveDiscovery, DiscoveryReport, DiscoverySettings};
use super::extraction_loop::{ExtractionLoop, ExtractionStats};
use super::field_extractor::FieldExtractor;
use super::record_assembler::RecordAssembler;

// Diagnostics only; never read back by a pass
static EXPORTED_RECORDS: AtomicU64 = AtomicU64::new(0);

/// Records exported by every pass in this process so far
pub fn exported_records_total() -> u64 {
    EXPORTED_RECORDS.load(Ordering::Relaxed)
}

/// Final state of one source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlStatus {
    Completed {
        records: usize,
        skipped: u32,
        /// Empty when the pass was interrupted before collecting anything
        files: Vec<PathBuf>,
        /// Cancelled mid-pass; the files hold what was collected so far
        interrupted: bool,
    },
    Failed {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReport {
    pub url: String,
    pub status: UrlStatus,
}

impl UrlReport {
    fn failed(url: &str, kind: &str, message: impl ToString) -> Self {
        Self {
            url: url.to_string(),
            status: UrlStatus::Failed {
                kind: kind.to_string(),
                message: message.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, UrlStatus::Completed { .. })
    }
}

/// What a pass produced before export
struct PassOutput {
    sink: ReviewSink,
    stats: ExtractionStats,
    discovery: Option<DiscoveryReport>,
    /// Cancelled before the listing was fully walked
    interrupted: bool,
}

/// Scrapes review listings with sessions from `L`
pub struct ReviewScraper<L: SessionLauncher> {
    launcher: L,
    config: AppConfig,
    exporter: RecordExporter,
}

impl<L: SessionLauncher> ReviewScraper<L> {
    pub fn new(launcher: L, config: AppConfig) -> Self {
        let exporter = RecordExporter::new(config.output.directory.clone());
        Self {
            launcher,
            config,
            exporter,
        }
    }

    /// Scrape every URL; reports come back in input order
    pub async fn run(&self, urls: &[String], cancel: &CancellationToken) -> Vec<UrlReport> {
        let total = urls.len();
        let concurrency = self.config.session.max_concurrent_sessions.max(1);
        info!("🚀 Scraping {} source(s), {} at a time", total, concurrency);

        let reports: Vec<UrlReport> = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move {
                let report = self.scrape_url(url, cancel).await;
                if index + 1 < total {
                    self.pause_between_urls(cancel).await;
                }
                report
            })
            .buffered(concurrency)
            .collect()
            .await;

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        info!(
            "🏁 Run finished: {} succeeded, {} failed, {} records exported in total",
            total - failed,
            failed,
            exported_records_total()
        );
        reports
    }

    /// One isolated pass over a single URL
    pub async fn scrape_url(&self, url: &str, cancel: &CancellationToken) -> UrlReport {
        let span = info_span!("scrape", url = %url, run_id = %Uuid::new_v4());
        self.scrape_url_inner(url, cancel).instrument(span).await
    }

    async fn scrape_url_inner(&self, url: &str, cancel: &CancellationToken) -> UrlReport {
        if cancel.is_cancelled() {
            return UrlReport::failed(url, "cancelled", "run cancelled before start");
        }

        let Some(profile) = self.config.profiles.for_url(url) else {
            warn!("❓ No source profile matches {}", url);
            return UrlReport::failed(url, "unsupported_source", format!("no source profile for {url}"));
        };
        info!("📋 Using profile '{}'", profile.name);

        let driver = match self.launcher.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                error!("❌ Could not launch session: {}", e);
                return UrlReport::failed(url, e.kind(), e);
            }
        };

        let result = self.run_pass(&driver, profile, url, cancel).await;
        if let Err(e) = driver.close().await {
            warn!("⚠️ Session close failed: {}", e);
        }

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                error!(kind = e.kind(), "❌ Pass aborted: {}", e);
                return UrlReport::failed(url, e.kind(), e);
            }
        };
        if let Some(report) = &output.discovery {
            debug!(?report, "Discovery summary");
        }

        if output.interrupted && output.sink.is_empty() {
            // Keep whatever an earlier run exported under the same name
            warn!("🛑 Pass interrupted before any review was collected; nothing exported");
            return UrlReport {
                url: url.to_string(),
                status: UrlStatus::Completed {
                    records: 0,
                    skipped: output.stats.skipped,
                    files: Vec::new(),
                    interrupted: true,
                },
            };
        }

        let stem = profile.file_naming.file_stem(url);
        match self.exporter.export_all(&output.sink, &stem, &self.config.output.formats) {
            Ok(files) => {
                EXPORTED_RECORDS.fetch_add(u64::try_from(output.sink.len()).unwrap_or(u64::MAX), Ordering::Relaxed);
                info!("✅ {} reviews from {}", output.sink.len(), url);
                UrlReport {
                    url: url.to_string(),
                    status: UrlStatus::Completed {
                        records: output.sink.len(),
                        skipped: output.stats.skipped,
                        files,
                        interrupted: output.interrupted,
                    },
                }
            }
            Err(e) => {
                error!("❌ Export failed: {:#}", e);
                UrlReport::failed(url, "export_error", format!("{e:#}"))
            }
        }
    }

    async fn run_pass<D: SessionDriver>(
        &self,
        driver: &D,
        profile: &SourceProfile,
        url: &str,
        cancel: &CancellationToken,
    ) -> ExtractionResult<PassOutput> {
        driver.navigate(url).await?;

        if let Some(action) = &profile.open_reviews {
            self.open_reviews(driver, action).await?;
        }

        let start = self.config.extraction.start_index.unwrap_or(profile.start_index);
        let (bound, discovery) = match profile.bound {
            BoundStrategy::Fixed { count } => (count, None),
            BoundStrategy::Discover => {
                let settings = DiscoverySettings::from(&self.config.discovery);
                let report = AdaptiveDiscovery::new(driver, &profile.item_locator, settings)
                    .with_end_marker(profile.end_marker.as_ref())
                    .discover(cancel)
                    .await?;
                (report.bound, Some(report))
            }
        };
        let bound = self
            .config
            .discovery
            .max_position
            .map_or(bound, |cap| bound.min(cap));

        if cancel.is_cancelled() {
            warn!("🛑 Cancelled before extraction (bound {})", bound);
            return Ok(PassOutput {
                sink: ReviewSink::new(url),
                stats: ExtractionStats::default(),
                discovery,
                interrupted: true,
            });
        }

        let extractor = FieldExtractor::new(driver, self.config.extraction.field_timeout());
        let assembler = RecordAssembler::new(extractor, &profile.fields).with_platform_label(profile.platform.clone());
        let outcome = ExtractionLoop::new(assembler)
            .extract_all(url, start, bound, cancel)
            .await?;

        Ok(PassOutput {
            sink: outcome.sink,
            interrupted: outcome.stats.cancelled,
            stats: outcome.stats,
            discovery,
        })
    }

    /// Reveal the full review list; a missing button is not fatal
    async fn open_reviews<D: SessionDriver>(&self, driver: &D, action: &ClickAction) -> ExtractionResult<()> {
        let locator = action.locator.page_level();
        let timeout = self.config.extraction.field_timeout();

        let node = match driver.query_node(&locator, timeout).await {
            Ok(node) => node,
            Err(e) if e.is_recoverable() => {
                warn!("⚠️ '{}' not found, continuing on the current view: {}", action.label, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match driver.scroll_into_view(&locator).await {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => debug!("Scroll to '{}' failed: {}", action.label, e),
            Err(e) => return Err(e),
        }
        driver.click(&node).await?;
        info!("🖱️ Clicked '{}'", action.label);

        let settle = self.config.discovery.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        Ok(())
    }

    async fn pause_between_urls(&self, cancel: &CancellationToken) {
        let delay = Duration::from_millis(self.config.session.inter_url_delay_ms);
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
