//! Error types and the error catalog for Distributed Build Replay.
//!
//! Recording failures are [`RecordError`]; wire mapping failures live next to
//! the protocol as [`crate::context::ContextError`]. Both map onto a stable
//! [`ErrorCode`] from the catalog.

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while recording fingerprints.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The content hasher or filesystem accessor failed for `path`.
    ///
    /// Never retried internally; recording is idempotent per path, so the
    /// caller may retry.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The symlink ancestor search walked more prefixes than allowed.
    #[error(
        "symlink classification of {} exceeded {max_depth} path components",
        path.display()
    )]
    ClassificationAmbiguity { path: PathBuf, max_depth: usize },

    /// The requested path is not under the project root.
    #[error("path {} is not under project root {}", path.display(), root.display())]
    OutsideProjectRoot { path: PathBuf, root: PathBuf },
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Catalog code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::RecordIoFailure,
            Self::ClassificationAmbiguity { .. } => ErrorCode::RecordClassificationAmbiguity,
            Self::OutsideProjectRoot { .. } => ErrorCode::RecordOutsideProjectRoot,
        }
    }
}

impl From<RecordError> for std::io::Error {
    fn from(err: RecordError) -> Self {
        let kind = match &err {
            RecordError::Io { source, .. } => source.kind(),
            RecordError::ClassificationAmbiguity { .. } => std::io::ErrorKind::InvalidData,
            RecordError::OutsideProjectRoot { .. } => std::io::ErrorKind::InvalidInput,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_codes_map_to_recording_category() {
        let errors = [
            RecordError::io("/p/a", std::io::Error::other("boom")),
            RecordError::ClassificationAmbiguity {
                path: PathBuf::from("/p/a"),
                max_depth: 4,
            },
            RecordError::OutsideProjectRoot {
                path: PathBuf::from("/q"),
                root: PathBuf::from("/p"),
            },
        ];
        for err in errors {
            assert_eq!(err.code().category(), ErrorCategory::Recording);
        }
    }

    #[test]
    fn io_error_message_names_path() {
        let err = RecordError::io("/p/missing", std::io::Error::other("gone"));
        let message = err.to_string();
        assert!(message.contains("/p/missing"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn io_conversion_keeps_source_kind() {
        let err = RecordError::io(
            "/p/missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let io_err: std::io::Error = err.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
    }
}
