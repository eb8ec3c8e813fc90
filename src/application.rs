//! Application layer - the extraction engine and per-URL orchestration
//!
//! Everything here is generic over the session driver traits, so the same
//! code runs against Chrome and against scripted in-memory documents.

pub mod discovery_service;
pub mod extraction_loop;
pub mod field_extractor;
pub mod record_assembler;
pub mod review_scraper;

// Re-export commonly used items
pub use discovery_service::{AdaptiveDiscovery, DiscoveryOutcome, DiscoveryReport, DiscoverySettings, DiscoveryStats};
pub use extraction_loop::{ExtractionLoop, ExtractionOutcome, ExtractionStats};
pub use field_extractor::FieldExtractor;
pub use record_assembler::RecordAssembler;
pub use review_scraper::{ReviewScraper, UrlReport, UrlStatus, exported_records_total};
