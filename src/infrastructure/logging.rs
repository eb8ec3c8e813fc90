//! Logging system configuration and initialization
//!
//! Sets up `tracing` with:
//! - console output with local timestamps
//! - an optional log file, rotated on startup and pruned to `max_files`
//! - optional JSON formatting for the file layer
//! - per-module level overrides, with `RUST_LOG` taking precedence

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the whole process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Timestamps in the machine's local time zone
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Optional stdout layer stacked on top of the file layer
fn console_layer<S>(enabled: bool) -> Option<impl Layer<S>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    enabled.then(|| fmt::Layer::new().with_timer(LocalTimeFormatter).with_target(false))
}

/// Resolve the log directory
///
/// An explicit directory wins; otherwise `logs/` next to the executable, then
/// the user's local data directory.
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.directory {
        return dir.clone();
    }

    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .or_else(|| dirs::data_local_dir().map(|d| d.join(env!("CARGO_PKG_NAME"))))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
        .join("logs")
}

/// Build the level filter from config
///
/// `RUST_LOG` overrides everything when set.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    // Browser protocol chatter stays quiet unless explicitly traced
    if !config.level.eq_ignore_ascii_case("trace") {
        let mut modules: Vec<_> = config.module_filters.iter().collect();
        modules.sort();
        for (module, level) in modules {
            let directive = format!("{module}={level}")
                .parse()
                .map_err(|e| anyhow!("Invalid module filter '{}={}': {}", module, level, e))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Initialize logging with the given configuration
///
/// Must be called once per process; the global subscriber cannot be replaced.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);
    let log_dir = get_log_directory(config);

    match (config.file_output, config.console_output) {
        (false, false) => return Err(anyhow!("No logging output configured")),
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(LocalTimeFormatter)
                .with_target(false);
            registry.with(console_layer).init();
        }
        (true, console) => {
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
            rotate_existing_log_file(&log_dir, &config.file_name)?;
            cleanup_old_logs(&log_dir, usize::try_from(config.max_files).unwrap_or(usize::MAX))?;

            let file_appender = rolling::never(&log_dir, &config.file_name);
            let (file_writer, file_guard) = non_blocking(file_appender);
            LOG_GUARDS
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false);
                registry.with(file_layer).with(console_layer(console)).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
                    .with_ansi(false);
                registry.with(file_layer).with(console_layer(console)).init();
            }
        }
    }

    info!("📝 Logging initialized (level: {}, json: {})", config.level, config.json_format);
    if config.file_output {
        info!("📂 Log directory: {:?}", log_dir);
    }
    Ok(())
}

/// Rename an existing log file with its modification timestamp
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let stamp: DateTime<Local> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let rotated_name = format!("{}.{}.log", file_stem, stamp.format("%Y%m%dT%H%M%S"));
    let rotated_path = log_dir.join(&rotated_name);

    std::fs::rename(&log_file_path, &rotated_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            rotated_path.display(),
            e
        )
    })?;
    Ok(())
}

/// Delete the oldest `.log` files so that at most `max_files` remain
///
/// Returns the number of files removed.
fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

/// Log runtime information for diagnostics
pub fn log_system_info() {
    info!("=== {} v{} ===", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(config.file_output);
        assert_eq!(config.module_filters.get("chromiumoxide").map(String::as_str), Some("warn"));
    }

    #[test]
    fn test_explicit_log_directory_wins() {
        let config = LoggingConfig {
            directory: Some(PathBuf::from("/tmp/harvest-logs")),
            ..Default::default()
        };
        assert_eq!(get_log_directory(&config), PathBuf::from("/tmp/harvest-logs"));

        let default_dir = get_log_directory(&LoggingConfig::default());
        assert!(default_dir.ends_with("logs"));
    }

    #[test]
    fn test_invalid_module_filter_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let mut config = LoggingConfig::default();
        config
            .module_filters
            .insert("chromiumoxide".into(), "not a level!".into());
        assert!(build_env_filter(&config).is_err());
    }

    #[test]
    fn test_rotation_renames_active_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("review-harvest.log"), "old run").unwrap();

        rotate_existing_log_file(dir.path(), "review-harvest.log").unwrap();

        assert!(!dir.path().join("review-harvest.log").exists());
        let rotated: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].starts_with("review-harvest.") && rotated[0].ends_with(".log"));
    }

    #[test]
    fn test_cleanup_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        for i in 0..4u64 {
            let path = dir.path().join(format!("run-{i}.log"));
            let file = std::fs::File::create(&path).unwrap();
            file.set_modified(now - Duration::from_secs(60 * (i + 1))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        let removed = cleanup_old_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join("run-0.log").exists());
        assert!(dir.path().join("run-1.log").exists());
        assert!(!dir.path().join("run-3.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
