//! Process-wide `tracing` setup for `dbr` binaries.
//!
//! Configured from `DBR_LOG_LEVEL` (filter directive), `DBR_LOG_FORMAT`
//! (`pretty`, `compact` or `json`) and `DBR_LOG_DIR` (adds a daily-rolling
//! JSON file next to the console output).

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::EnvParser;
use crate::errors::ErrorCode;

const LOG_FILE_PREFIX: &str = "dbr.log";

/// Console output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

impl LoggingError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InternalLoggingError
    }
}

/// How to set up logging for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    stderr: bool,
    file_dir: Option<PathBuf>,
}

impl LogConfig {
    /// Start from `default_level` and apply `DBR_LOG_*` overrides.
    ///
    /// Invalid overrides are ignored; logging is not up yet to report them.
    pub fn from_env(default_level: &str) -> Self {
        let mut parser = EnvParser::new();
        let level = parser
            .get_log_level("LOG_LEVEL")
            .map(|s| s.value)
            .unwrap_or_else(|| default_level.to_string());
        let format = parser
            .get_optional_string("LOG_FORMAT")
            .and_then(|s| LogFormat::parse(&s.value))
            .unwrap_or_default();
        let file_dir = parser.get_path("LOG_DIR").map(|s| s.value);
        Self {
            level,
            format,
            stderr: false,
            file_dir,
        }
    }

    /// Also write console output to stderr.
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Keeps background log writers alive; drop it last.
#[must_use = "dropping the guards stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuards {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards, LoggingError> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.stderr {
        let layer = match config.format {
            LogFormat::Pretty => fmt::layer().with_writer(io::stderr).boxed(),
            LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        };
        layers.push(layer);
    }

    let mut guards = LoggingGuards::default();
    if let Some(dir) = &config.file_dir {
        fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        guards._file = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(config.env_filter())
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(guards)
}
