//! Review Harvest - app store review extraction
//!
//! Pulls review records out of lazily-loaded store listings by walking a
//! position index over the rendered document, discovering how far the
//! listing goes when the store gives no count, and writes one table per
//! source page.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry points
pub use application::{ReviewScraper, UrlReport, UrlStatus};
pub use domain::{ReviewRecord, ReviewSink, SessionDriver, SessionLauncher};
pub use infrastructure::{AppConfig, ChromeLauncher, ExtractionError, ExtractionResult};
