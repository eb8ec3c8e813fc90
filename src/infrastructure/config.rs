//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, an optional config file, then
//! `REVIEW_HARVEST__*` environment variables. The CLI applies its own
//! overrides on top of the loaded value.

#![allow(clippy::derivable_impls)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::source_profiles::SourceProfiles;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "REVIEW_HARVEST";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source URLs to scrape, in order
    pub sources: Vec<String>,

    /// Where and how results are written
    pub output: OutputConfig,

    /// Field extraction settings
    pub extraction: ExtractionConfig,

    /// Adaptive discovery settings
    pub discovery: DiscoveryConfig,

    /// Browser launch settings
    pub browser: BrowserConfig,

    /// Session scheduling settings
    pub session: SessionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Per-store locator profiles
    pub profiles: SourceProfiles,
}

/// Export target settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, created on demand
    pub directory: PathBuf,

    /// Formats written for every source URL
    pub formats: Vec<ExportFormat>,
}

/// Tabular export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Excel workbook with a single `Reviews` sheet
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Field delimiter for the text formats; `None` for workbooks
    pub fn delimiter(self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Xlsx => None,
        }
    }
}

/// Field extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Bounded wait for each field node in milliseconds
    pub field_timeout_ms: u64,

    /// Overrides the profile's first position when set
    pub start_index: Option<u32>,
}

impl ExtractionConfig {
    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }
}

/// Adaptive discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// First probe distance and initial stride
    pub initial_stride: u32,

    /// Discovery stops once the stride decays to this value
    ///
    /// The discovered bound undershoots the true count by at most this much.
    pub stop_stride: u32,

    /// Bounded wait for each probe in milliseconds
    pub probe_timeout_ms: u64,

    /// Pause after a scroll so lazily loaded content can render
    pub settle_delay_ms: u64,

    /// Hard ceiling on probed positions
    pub max_position: Option<u32>,
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Chrome executable; auto-detected when unset
    pub executable: Option<PathBuf>,

    /// Browser UI and `Accept-Language` locale
    pub locale: String,

    /// User agent override
    pub user_agent: Option<String>,

    pub window_width: u32,
    pub window_height: u32,

    /// How long to wait for the browser to come up
    pub launch_timeout_ms: u64,
}

/// Session scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Source URLs processed at once, each in its own browser
    pub max_concurrent_sessions: usize,

    /// Pause after each URL in milliseconds
    pub inter_url_delay_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; defaults to `logs/` next to the executable
    pub directory: Option<PathBuf>,

    /// Active log file name
    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Module-specific log level filters (e.g., "chromiumoxide": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output: OutputConfig::default(),
            extraction: ExtractionConfig::default(),
            discovery: DiscoveryConfig::default(),
            browser: BrowserConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            profiles: SourceProfiles::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(defaults::OUTPUT_DIRECTORY),
            formats: vec![ExportFormat::Csv],
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            field_timeout_ms: defaults::FIELD_TIMEOUT_MS,
            start_index: None,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            initial_stride: defaults::INITIAL_STRIDE,
            stop_stride: defaults::STOP_STRIDE,
            probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            max_position: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            locale: defaults::BROWSER_LOCALE.to_string(),
            user_agent: None,
            window_width: defaults::WINDOW_WIDTH,
            window_height: defaults::WINDOW_HEIGHT,
            launch_timeout_ms: defaults::LAUNCH_TIMEOUT_MS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: defaults::MAX_CONCURRENT_SESSIONS,
            inter_url_delay_ms: defaults::INTER_URL_DELAY_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("chromiumoxide".to_string(), "warn".to_string());
                filters.insert("tungstenite".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        match path {
            Some(path) => info!("Loaded configuration from: {:?}", path),
            None => info!("Using built-in configuration"),
        }
        Ok(config)
    }

    /// Configuration value validation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| {
            Err(ConfigError::Validation {
                message: message.to_string(),
            })
        };

        if self.extraction.field_timeout_ms == 0 {
            return fail("extraction.field_timeout_ms must be greater than 0");
        }
        if self.extraction.start_index == Some(0) {
            return fail("extraction.start_index is 1-based and must be greater than 0");
        }
        if self.discovery.initial_stride == 0 {
            return fail("discovery.initial_stride must be greater than 0");
        }
        if self.discovery.stop_stride >= self.discovery.initial_stride {
            return fail("discovery.stop_stride must be smaller than discovery.initial_stride");
        }
        if self.discovery.probe_timeout_ms == 0 {
            return fail("discovery.probe_timeout_ms must be greater than 0");
        }
        if self.session.max_concurrent_sessions == 0 {
            return fail("session.max_concurrent_sessions must be greater than 0");
        }
        if self.output.formats.is_empty() {
            return fail("output.formats must name at least one format");
        }
        if !self.logging.console_output && !self.logging.file_output {
            return fail("logging needs console_output or file_output");
        }
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Default output directory
    pub const OUTPUT_DIRECTORY: &str = "output";

    /// Default bounded wait per field in milliseconds
    pub const FIELD_TIMEOUT_MS: u64 = 10_000;

    /// Default discovery seed and initial stride
    pub const INITIAL_STRIDE: u32 = 20;

    /// Default stride at which discovery stops
    pub const STOP_STRIDE: u32 = 0;

    /// Default bounded wait per discovery probe in milliseconds
    pub const PROBE_TIMEOUT_MS: u64 = 10_000;

    /// Default pause after a scroll in milliseconds
    pub const SETTLE_DELAY_MS: u64 = 2_000;

    /// Default browser locale
    pub const BROWSER_LOCALE: &str = "de";

    pub const WINDOW_WIDTH: u32 = 1920;
    pub const WINDOW_HEIGHT: u32 = 1080;

    /// Default browser launch timeout in milliseconds
    pub const LAUNCH_TIMEOUT_MS: u64 = 20_000;

    /// Default number of concurrent browser sessions
    pub const MAX_CONCURRENT_SESSIONS: usize = 1;

    /// Default pause between source URLs in milliseconds
    pub const INTER_URL_DELAY_MS: u64 = 5_000;

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = true;

    /// Default active log file name
    pub const LOG_FILE_NAME: &str = "review-harvest.log";

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;
}
