//! Tracing setup for embedders of the core library.
//!
//! The library itself only emits `tracing` events. An application that wants
//! them on screen or on disk calls [`init`] once; a second call, or a call
//! after the host installed its own subscriber, fails with
//! [`LoggingError::AlreadyInitialized`] instead of panicking.
//!
//! Console output is plain text filtered by `RUST_LOG` when set. File output
//! is optional, JSON, and rolls over on the configured schedule.

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Target name of this crate in filter directives.
const CRATE_TARGET: &str = "musiclib_core";

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    /// One file per hour.
    Hourly,
    /// One file per day.
    #[default]
    Daily,
    /// A single file.
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

/// JSON log file settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    /// Directory the files are written to. Created if missing.
    pub directory: PathBuf,
    /// File name prefix; the date suffix is added by the appender.
    pub prefix: String,
    /// Level for this crate's events in the file.
    pub level: Level,
    /// Roll-over schedule.
    pub rotation: LogRotation,
}

/// What [`init`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for this crate's events on the console. Other crates stay at warn.
    pub console_level: Level,
    /// Emit ANSI colors on the console.
    pub console_ansi: bool,
    /// Also write JSON logs to disk.
    pub file: Option<FileOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: if cfg!(debug_assertions) {
                Level::DEBUG
            } else {
                Level::INFO
            },
            console_ansi: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Set the console level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Write daily-rotated JSON logs at debug level into `directory`.
    #[must_use]
    pub fn with_file_output(mut self, directory: impl Into<PathBuf>) -> Self {
        self.file = Some(FileOutput {
            directory: directory.into(),
            prefix: "musiclib".to_string(),
            level: Level::DEBUG,
            rotation: LogRotation::default(),
        });
        self
    }

    /// Change the rotation of the file output, if any.
    #[must_use]
    pub fn with_rotation(mut self, rotation: LogRotation) -> Self {
        if let Some(file) = self.file.as_mut() {
            file.rotation = rotation;
        }
        self
    }
}

/// Keeps the background file writer alive. Dropping it flushes pending lines.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The directory.
        path: PathBuf,
        /// The IO error.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate_directives(config.console_level)));
    let console_layer = fmt::layer()
        .with_ansi(config.console_ansi)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &config.file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(open_appender(file)?);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(EnvFilter::new(crate_directives(file.level)));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

fn open_appender(file: &FileOutput) -> Result<RollingFileAppender, LoggingError> {
    ensure_directory(&file.directory)?;
    Ok(RollingFileAppender::new(file.rotation.into(), &file.directory, &file.prefix))
}

fn ensure_directory(path: &Path) -> Result<(), LoggingError> {
    std::fs::create_dir_all(path).map_err(|e| LoggingError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Platform log directory: `<data_local_dir>/musiclib/logs`.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("musiclib")
        .join("logs")
}

/// Other crates at warn, this crate at `level`.
fn crate_directives(level: Level) -> String {
    format!("warn,{CRATE_TARGET}={}", level.as_str().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_logs_to_console_only() {
        let config = LoggingConfig::default();
        assert!(config.file.is_none());
        assert!(config.console_ansi);
    }

    #[test]
    fn test_file_output_builder() {
        let config = LoggingConfig::default()
            .with_console_level(Level::WARN)
            .with_file_output("/tmp/musiclib-logs")
            .with_rotation(LogRotation::Hourly);

        assert_eq!(config.console_level, Level::WARN);
        let file = config.file.expect("file output");
        assert_eq!(file.directory, PathBuf::from("/tmp/musiclib-logs"));
        assert_eq!(file.rotation, LogRotation::Hourly);
        assert_eq!(file.level, Level::DEBUG);
    }

    #[test]
    fn test_rotation_without_file_is_ignored() {
        let config = LoggingConfig::default().with_rotation(LogRotation::Never);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_crate_directives() {
        assert_eq!(crate_directives(Level::DEBUG), "warn,musiclib_core=debug");
        assert_eq!(crate_directives(Level::TRACE), "warn,musiclib_core=trace");
    }

    #[test]
    fn test_directory_creation_failure() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").expect("Should write");

        let result = ensure_directory(&blocker.join("logs"));
        assert!(matches!(result, Err(LoggingError::DirectoryCreationFailed { .. })));
    }

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config = LoggingConfig::default().with_file_output(temp_dir.path());

        let _guard = init(&config).expect("first init");
        assert!(temp_dir.path().exists());

        let second = init(&config);
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_default_log_directory() {
        let dir = default_log_directory();
        assert!(dir.ends_with("musiclib/logs"));
    }
}
