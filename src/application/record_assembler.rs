//! Record Assembler
//!
//! Composes one review from the field specs sharing a position. Field
//! failures are logged and leave the field absent; only a session fault
//! escapes.

use tracing::{debug, warn};

use crate::domain::{FieldSpec, FieldValue, ReviewField, ReviewRecord, SessionDriver};
use crate::infrastructure::extraction_error::ExtractionResult;

use super::field_extractor::FieldExtractor;

/// Builds review records position by position for one page
pub struct RecordAssembler<'a, D: SessionDriver> {
    extractor: FieldExtractor<'a, D>,
    fields: &'a [FieldSpec],
    platform_label: Option<String>,
    /// Page-scope values, resolved on the first non-empty position
    page_values: Option<Vec<(ReviewField, FieldValue)>>,
}

impl<'a, D: SessionDriver> RecordAssembler<'a, D> {
    pub fn new(extractor: FieldExtractor<'a, D>, fields: &'a [FieldSpec]) -> Self {
        Self {
            extractor,
            fields,
            platform_label: None,
            page_values: None,
        }
    }

    /// Constant platform label used when no platform field resolves
    #[must_use]
    pub fn with_platform_label(mut self, label: Option<String>) -> Self {
        self.platform_label = label;
        self
    }

    /// Assemble the record at `position`
    ///
    /// Returns an empty record when no per-review field resolved; page-scope
    /// values are not stamped onto it, so the caller can discard it.
    pub async fn assemble(&mut self, position: u32) -> ExtractionResult<ReviewRecord> {
        let mut record = ReviewRecord::default();
        let mut resolved = 0usize;

        for spec in self.fields.iter().filter(|spec| !spec.is_page_scoped()) {
            match self.extractor.resolve(spec, position).await {
                Ok(value) => {
                    record.set(spec.field, value);
                    resolved += 1;
                }
                Err(e) if e.is_recoverable() => {
                    warn!(position, field = %spec.field, kind = e.kind(), "⚠️ Field skipped: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if resolved == 0 {
            return Ok(record);
        }

        if self.page_values.is_none() {
            self.page_values = Some(self.resolve_page_fields(position).await?);
        }
        for (field, value) in self.page_values.iter().flatten() {
            record.set(*field, value.clone());
        }
        if record.platform.is_none() {
            record.platform = self.platform_label.clone();
        }

        Ok(record)
    }

    async fn resolve_page_fields(&self, position: u32) -> ExtractionResult<Vec<(ReviewField, FieldValue)>> {
        let mut values = Vec::new();
        for spec in self.fields.iter().filter(|spec| spec.is_page_scoped()) {
            match self.extractor.resolve(spec, position).await {
                Ok(value) => {
                    debug!(field = %spec.field, "📌 Page field resolved: {:?}", value);
                    values.push((spec.field, value));
                }
                Err(e) if e.is_recoverable() => {
                    warn!(position, field = %spec.field, kind = e.kind(), "⚠️ Page field skipped: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }
}
