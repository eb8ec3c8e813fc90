//! Infrastructure layer for browser sessions, configuration, and file output
//!
//! Concrete session drivers live here next to the config, logging, and
//! export plumbing. The application layer only sees the domain traits.

pub mod chrome_session; // Chromium over the DevTools protocol
pub mod config; // Layered configuration and defaults
pub mod extraction_error;
pub mod logging;
pub mod memory_session; // Scripted sessions for tests and benches
pub mod record_export;
pub mod source_profiles;

// Re-export commonly used items
pub use chrome_session::{ChromeLauncher, ChromeSession};
pub use config::{AppConfig, ExportFormat};
pub use extraction_error::{ExtractionError, ExtractionResult};
pub use memory_session::{InMemoryLauncher, InMemorySession, MemoryNode};
pub use record_export::RecordExporter;
pub use source_profiles::{BoundStrategy, ClickAction, FileNaming, SourceProfile, SourceProfiles};
