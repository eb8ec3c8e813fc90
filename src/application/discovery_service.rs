//! Adaptive Discovery Service
//!
//! Finds the highest position holding a review on a lazily-loaded listing
//! that exposes no total count. Probes gallop forward by `stride` while they
//! succeed; every miss shrinks the stride by one and backs off to the last
//! confirmed position. Discovery ends when the stride decays to the
//! configured stop stride, on an external cap, or on cancellation. An
//! end-of-content marker means every review is already rendered: misses
//! after it skip the scroll-and-retry, but the stride still decays so the
//! bound lands on the real last position.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{LocatorTemplate, SessionDriver};
use crate::infrastructure::config::DiscoveryConfig;
use crate::infrastructure::extraction_error::ExtractionResult;

/// Knobs for one discovery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub initial_stride: u32,
    /// Stride at or below which the search stops; bounds the overshoot
    pub stop_stride: u32,
    pub probe_timeout: Duration,
    /// Pause after scrolling so the next batch can render
    pub settle_delay: Duration,
    pub max_position: Option<u32>,
}

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            initial_stride: config.initial_stride,
            stop_stride: config.stop_stride,
            probe_timeout: config.probe_timeout(),
            settle_delay: config.settle_delay(),
            max_position: config.max_position,
        }
    }
}

/// Why discovery stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Stride decayed to the stop stride
    Exhausted,
    /// Stride decayed after the end-of-content marker showed up
    EndOfContent,
    /// The next probe would pass `max_position`
    CapReached,
    Cancelled,
}

/// Per-pass probe accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub probes: u32,
    pub scrolls: u32,
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Highest confirmed position; 0 when nothing was found
    pub bound: u32,
    pub outcome: DiscoveryOutcome,
    pub stats: DiscoveryStats,
}

/// Galloping search with a shrinking stride over one session
pub struct AdaptiveDiscovery<'a, D: SessionDriver> {
    driver: &'a D,
    item: &'a LocatorTemplate,
    end_marker: Option<&'a LocatorTemplate>,
    settings: DiscoverySettings,
}

impl<'a, D: SessionDriver> AdaptiveDiscovery<'a, D> {
    pub fn new(driver: &'a D, item: &'a LocatorTemplate, settings: DiscoverySettings) -> Self {
        Self {
            driver,
            item,
            end_marker: None,
            settings,
        }
    }

    #[must_use]
    pub fn with_end_marker(mut self, marker: Option<&'a LocatorTemplate>) -> Self {
        self.end_marker = marker;
        self
    }

    /// Run the search and report the discovered bound
    pub async fn discover(&self, cancel: &CancellationToken) -> ExtractionResult<DiscoveryReport> {
        let settings = self.settings;
        let mut stats = DiscoveryStats::default();
        let mut stride = settings.initial_stride;
        let mut bound = 0u32;
        let mut cursor = stride;
        let mut fully_rendered = false;

        info!("🔍 Starting adaptive discovery (stride {}, stop at {})", stride, settings.stop_stride);

        let outcome = loop {
            if cancel.is_cancelled() {
                break DiscoveryOutcome::Cancelled;
            }
            if stride <= settings.stop_stride {
                break if fully_rendered {
                    DiscoveryOutcome::EndOfContent
                } else {
                    DiscoveryOutcome::Exhausted
                };
            }
            if settings.max_position.is_some_and(|cap| cursor > cap) {
                break DiscoveryOutcome::CapReached;
            }

            let present = if fully_rendered {
                self.probe(cursor, &mut stats).await?
            } else {
                self.probe_with_retry(cursor, bound, &mut stats).await?
            };
            if present {
                debug!("✅ Position {} present (stride {})", cursor, stride);
                bound = cursor;
                if !fully_rendered {
                    self.scroll_to(bound, &mut stats).await?;
                }
                cursor = bound.saturating_add(stride);
                continue;
            }

            debug!("❌ Position {} absent (stride {})", cursor, stride);
            if !fully_rendered && self.end_of_content().await? {
                debug!("🏁 End-of-content marker present; no more lazy loading");
                fully_rendered = true;
            }
            stride -= 1;
            cursor = bound.saturating_add(stride);
        };

        info!(
            "🎯 Discovery finished: bound {} ({:?}, {} probes, {} scrolls)",
            bound, outcome, stats.probes, stats.scrolls
        );
        Ok(DiscoveryReport { bound, outcome, stats })
    }

    async fn probe(&self, position: u32, stats: &mut DiscoveryStats) -> ExtractionResult<bool> {
        stats.probes += 1;
        match self
            .driver
            .query_node(&self.item.at(position), self.settings.probe_timeout)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_recoverable() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Probe `position`; on a miss, scroll to the last confirmed position to
    /// trigger lazy loading and probe once more
    async fn probe_with_retry(&self, position: u32, bound: u32, stats: &mut DiscoveryStats) -> ExtractionResult<bool> {
        if self.probe(position, stats).await? {
            return Ok(true);
        }
        if bound > 0 {
            self.scroll_to(bound, stats).await?;
        }
        stats.retries += 1;
        self.probe(position, stats).await
    }

    async fn scroll_to(&self, position: u32, stats: &mut DiscoveryStats) -> ExtractionResult<()> {
        stats.scrolls += 1;
        match self.driver.scroll_into_view(&self.item.at(position)).await {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => debug!("Scroll to position {} failed: {}", position, e),
            Err(e) => return Err(e),
        }
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        Ok(())
    }

    async fn end_of_content(&self) -> ExtractionResult<bool> {
        let Some(marker) = self.end_marker else {
            return Ok(false);
        };
        match self.driver.query_node(&marker.page_level(), Duration::ZERO).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_recoverable() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
