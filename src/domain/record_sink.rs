//! Per-URL record sink
//!
//! Created fresh for every source URL and dropped after export.

use super::review::ReviewRecord;

/// Ordered accumulator of the reviews scraped from one page
#[derive(Debug, Clone, Default)]
pub struct ReviewSink {
    source_url: String,
    records: Vec<ReviewRecord>,
}

impl ReviewSink {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            records: Vec::new(),
        }
    }

    /// Append a record; records with no resolved field are rejected
    ///
    /// Returns whether the record was kept.
    pub fn append(&mut self, record: ReviewRecord) -> bool {
        if record.is_empty() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
