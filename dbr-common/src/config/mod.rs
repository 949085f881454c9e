//! Configuration for the recorder and the `dbr` binary.
//!
//! Values resolve in order: built-in default, TOML config file, `DBR_*`
//! environment variable, command-line flag. Every resolved value keeps its
//! [`Sourced`] origin so `dbr` can log where a setting came from.
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [recording]
//! max_symlink_depth = 64
//! threads = 8
//! ```

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use source::{ConfigSource, Sourced};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::errors::ErrorCode;
use crate::symlink::DEFAULT_MAX_SYMLINK_DEPTH;

const MAX_THREADS: usize = 1024;
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
const MAX_SYMLINK_DEPTH_LIMIT: usize = 4096;

/// Failures while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("invalid environment overrides: {}", format_env_errors(.0))]
    Env(Vec<EnvError>),
}

fn format_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ConfigReadError,
            Self::Parse { .. } | Self::Invalid { .. } => ErrorCode::ConfigParseError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
        }
    }
}

/// Contents of `config.toml`. Unset keys fall through to lower-precedence
/// sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DistBuildConfig {
    pub general: GeneralConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// `tracing` level for the binary: trace, debug, info, warn, error, off.
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingConfig {
    /// Bound on path prefixes walked and symlink hops followed.
    pub max_symlink_depth: Option<usize>,
    /// Paths recorded in parallel.
    pub threads: Option<usize>,
}

/// Effective settings after every source has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub log_level: Sourced<String>,
    pub max_symlink_depth: Sourced<usize>,
    pub threads: Sourced<usize>,
}

/// `$XDG_CONFIG_HOME/dbr/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbr").join("config.toml"))
}

fn from_file<T>(value: T, origin: Option<&Path>) -> Sourced<T> {
    match origin {
        Some(path) => Sourced::from_file(value, path.display().to_string()),
        None => Sourced::from_file(value, "<inline>"),
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl DistBuildConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let (candidate, explicit) = match path {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };
        let Some(candidate) = candidate else {
            return Ok((Self::default(), None));
        };

        match fs::read_to_string(&candidate) {
            Ok(contents) => {
                debug!(path = %candidate.display(), "loaded config file");
                Ok((Self::from_toml_str(&contents, &candidate)?, Some(candidate)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
                debug!(path = %candidate.display(), "no config file, using defaults");
                Ok((Self::default(), None))
            }
            Err(source) => Err(ConfigError::Read {
                path: candidate,
                source,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.general.log_level
            && !LOG_LEVELS.contains(&level.to_lowercase().as_str())
        {
            return Err(ConfigError::Invalid {
                field: "general.log_level".to_string(),
                message: format!("expected one of {}, got {level}", LOG_LEVELS.join(", ")),
            });
        }
        if let Some(depth) = self.recording.max_symlink_depth
            && !(1..=MAX_SYMLINK_DEPTH_LIMIT).contains(&depth)
        {
            return Err(ConfigError::Invalid {
                field: "recording.max_symlink_depth".to_string(),
                message: format!("must be in 1..={MAX_SYMLINK_DEPTH_LIMIT}, got {depth}"),
            });
        }
        if let Some(threads) = self.recording.threads
            && !(1..=MAX_THREADS).contains(&threads)
        {
            return Err(ConfigError::Invalid {
                field: "recording.threads".to_string(),
                message: format!("must be in 1..={MAX_THREADS}, got {threads}"),
            });
        }
        Ok(())
    }

    /// Layer file values (from `origin`) and `DBR_*` variables over the
    /// defaults. All environment errors are reported together.
    pub fn resolve(&self, origin: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        let mut log_level = Sourced::default_value("info".to_string())
            .or_override(self.general.log_level.clone().map(|v| from_file(v, origin)));
        let mut max_symlink_depth = Sourced::default_value(DEFAULT_MAX_SYMLINK_DEPTH)
            .or_override(self.recording.max_symlink_depth.map(|v| from_file(v, origin)));
        let mut threads = Sourced::default_value(default_threads())
            .or_override(self.recording.threads.map(|v| from_file(v, origin)));

        let mut parser = EnvParser::new();
        log_level = log_level.or_override(parser.get_log_level("LOG_LEVEL"));
        max_symlink_depth = max_symlink_depth.or_override(parser.get_usize_range(
            "MAX_SYMLINK_DEPTH",
            1,
            MAX_SYMLINK_DEPTH_LIMIT,
        ));
        threads = threads.or_override(parser.get_usize_range("THREADS", 1, MAX_THREADS));
        if parser.has_errors() {
            return Err(ConfigError::Env(parser.take_errors()));
        }

        Ok(ResolvedConfig {
            log_level,
            max_symlink_depth,
            threads,
        })
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock, PoisonError};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
