//! Indexed Extraction Loop
//!
//! Walks positions in ascending order and collects the non-empty records.
//! A failed position is logged and skipped, never retried in the same pass.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ReviewSink, SessionDriver};
use crate::infrastructure::extraction_error::ExtractionResult;

use super::record_assembler::RecordAssembler;

/// Counters for one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub attempted: u32,
    pub appended: u32,
    pub skipped: u32,
    /// The pass stopped early on cancellation
    pub cancelled: bool,
}

/// Records of a pass together with its counters
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub sink: ReviewSink,
    pub stats: ExtractionStats,
}

/// Drives the record assembler across `[start, bound]`
pub struct ExtractionLoop<'a, D: SessionDriver> {
    assembler: RecordAssembler<'a, D>,
}

impl<'a, D: SessionDriver> ExtractionLoop<'a, D> {
    pub fn new(assembler: RecordAssembler<'a, D>) -> Self {
        Self { assembler }
    }

    /// Extract every position from `start` to `bound` inclusive
    ///
    /// A bound below `start` is a no-op that touches the session zero times.
    /// Cancellation is honored between positions.
    pub async fn extract_all(
        &mut self,
        source_url: &str,
        start: u32,
        bound: u32,
        cancel: &CancellationToken,
    ) -> ExtractionResult<ExtractionOutcome> {
        let mut sink = ReviewSink::new(source_url);
        let mut stats = ExtractionStats::default();

        if bound < start {
            info!("📭 No content to extract (bound {} < start {})", bound, start);
            return Ok(ExtractionOutcome { sink, stats });
        }

        info!("📝 Extracting positions {}..={}", start, bound);
        for position in start..=bound {
            if cancel.is_cancelled() {
                warn!("🛑 Extraction cancelled before position {}", position);
                stats.cancelled = true;
                break;
            }

            stats.attempted += 1;
            let record = self.assembler.assemble(position).await?;
            if sink.append(record) {
                stats.appended += 1;
                debug!(position, "✅ Record appended");
            } else {
                stats.skipped += 1;
                warn!(position, "⚠️ Position skipped: no field resolved");
            }
        }

        info!(
            "📊 Extraction finished: {} appended, {} skipped of {} positions",
            stats.appended, stats.skipped, stats.attempted
        );
        Ok(ExtractionOutcome { sink, stats })
    }
}
