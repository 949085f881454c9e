//! Error Catalog for Distributed Build Replay
//!
//! Every failure surfaced to users maps to a stable code:
//! - A unique code (DBR-E001 through DBR-E599)
//! - A human-readable message
//! - Remediation steps
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                               |
//! |------------|-------------|-------------------------------------------|
//! | E001-E099  | Config      | Configuration file and environment errors |
//! | E100-E199  | Recording   | Fingerprint manifest recording errors     |
//! | E200-E299  | Context     | Execution-context wire mapping errors     |
//! | E500-E599  | Internal    | Internal/unexpected errors                |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering all DBR error scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML syntax
    ConfigParseError,
    /// Environment variable has invalid value
    ConfigEnvError,

    // =========================================================================
    // Recording Errors (E100-E199)
    // =========================================================================
    /// Content hasher or filesystem accessor failed
    RecordIoFailure,
    /// Symlink ancestor search exceeded its depth bound
    RecordClassificationAmbiguity,
    /// Requested path lies outside the project root
    RecordOutsideProjectRoot,

    // =========================================================================
    // Context Errors (E200-E299)
    // =========================================================================
    /// Required wire key is absent
    ContextMissingField,
    /// Wire value has the wrong shape
    ContextInvalidField,
    /// Wire value names an unknown enum variant
    ContextUnknownVariant,

    // =========================================================================
    // Internal Errors (E500-E599)
    // =========================================================================
    /// Serialization of an internal structure failed
    InternalSerdeError,
    /// Logging could not be initialized
    InternalLoggingError,
}

impl ErrorCode {
    /// Returns the numeric error code (without prefix).
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ConfigReadError => 1,
            Self::ConfigParseError => 2,
            Self::ConfigEnvError => 3,

            Self::RecordIoFailure => 100,
            Self::RecordClassificationAmbiguity => 101,
            Self::RecordOutsideProjectRoot => 102,

            Self::ContextMissingField => 200,
            Self::ContextInvalidField => 201,
            Self::ContextUnknownVariant => 202,

            Self::InternalSerdeError => 500,
            Self::InternalLoggingError => 501,
        }
    }

    /// Returns the formatted error code string (e.g., "DBR-E001").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("DBR-E{:03}", self.code_number())
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Recording,
            200..=299 => ErrorCategory::Context,
            _ => ErrorCategory::Internal,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Returns the error message template.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML syntax",
            Self::ConfigEnvError => "Environment variable has invalid value",

            Self::RecordIoFailure => "Failed to hash or stat a build input",
            Self::RecordClassificationAmbiguity => {
                "Symlink ancestor search exceeded its depth bound"
            }
            Self::RecordOutsideProjectRoot => "Build input lies outside the project root",

            Self::ContextMissingField => "Execution context mapping is missing a required key",
            Self::ContextInvalidField => "Execution context mapping has a malformed value",
            Self::ContextUnknownVariant => "Execution context mapping names an unknown variant",

            Self::InternalSerdeError => "Failed to serialize internal state",
            Self::InternalLoggingError => "Failed to initialize logging",
        }
    }

    /// Returns remediation steps for this error.
    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigReadError => &[
                "Check that the configuration file exists and is readable",
                "Pass --config to point at a different file",
            ],
            Self::ConfigParseError => &[
                "Validate the file with a TOML linter",
                "Compare against the documented [general] and [recording] sections",
            ],
            Self::ConfigEnvError => &[
                "Inspect DBR_* environment variables",
                "Unset the variable to fall back to the configured value",
            ],
            Self::RecordIoFailure => &[
                "Check that the input still exists and is readable",
                "Re-run the recording; already recorded paths are not duplicated",
            ],
            Self::RecordClassificationAmbiguity => &[
                "Look for cyclic or very deep symlink chains under the project root",
                "Raise [recording] max_symlink_depth if the nesting is legitimate",
            ],
            Self::RecordOutsideProjectRoot => &[
                "Reference the input through a symlink inside the project root",
                "Check the --root argument",
            ],
            Self::ContextMissingField | Self::ContextInvalidField | Self::ContextUnknownVariant => &[
                "Make sure the sending and receiving sides run the same dbr version",
                "Run `dbr context check` on the payload to locate the offending key",
            ],
            Self::InternalSerdeError | Self::InternalLoggingError => &[
                "Re-run with DBR_LOG_LEVEL=debug",
                "Report the issue with the debug output attached",
            ],
        }
    }

    /// All error codes, in code order.
    #[must_use]
    pub fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigEnvError,
            Self::RecordIoFailure,
            Self::RecordClassificationAmbiguity,
            Self::RecordOutsideProjectRoot,
            Self::ContextMissingField,
            Self::ContextInvalidField,
            Self::ContextUnknownVariant,
            Self::InternalSerdeError,
            Self::InternalLoggingError,
        ]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration and environment errors (E001-E099)
    Config,
    /// Manifest recording errors (E100-E199)
    Recording,
    /// Execution-context wire mapping errors (E200-E299)
    Context,
    /// Internal/unexpected errors (E500-E599)
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Recording => "Recording",
            Self::Context => "Context",
            Self::Internal => "Internal",
        }
    }

    /// Returns a short description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Config => "Configuration file and environment setup issues",
            Self::Recording => "Input fingerprinting and manifest recording issues",
            Self::Context => "Execution-context serialization and reconstruction issues",
            Self::Internal => "Internal errors that may indicate bugs",
        }
    }

    /// Code range covered by the category, without prefix.
    #[must_use]
    pub const fn code_range(&self) -> &'static str {
        match self {
            Self::Config => "001-099",
            Self::Recording => "100-199",
            Self::Context => "200-299",
            Self::Internal => "500-599",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ErrorEntry {
    /// Error code string (e.g., "DBR-E001")
    pub code: String,
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("Remediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::all() {
            let num = code.code_number();
            assert!(
                seen.insert(num),
                "Duplicate error code number: {} for {:?}",
                num,
                code
            );
        }
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigReadError.code_string(), "DBR-E001");
        assert_eq!(ErrorCode::RecordIoFailure.code_string(), "DBR-E100");
        assert_eq!(ErrorCode::ContextMissingField.code_string(), "DBR-E200");
        assert_eq!(ErrorCode::InternalSerdeError.code_string(), "DBR-E500");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::ConfigEnvError.category(), ErrorCategory::Config);
        assert_eq!(
            ErrorCode::RecordClassificationAmbiguity.category(),
            ErrorCategory::Recording
        );
        assert_eq!(
            ErrorCode::ContextUnknownVariant.category(),
            ErrorCategory::Context
        );
        assert_eq!(
            ErrorCode::InternalLoggingError.category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_every_code_has_remediation() {
        for code in ErrorCode::all() {
            assert!(
                !code.remediation().is_empty(),
                "{:?} is missing remediation steps",
                code
            );
        }
    }

    #[test]
    fn test_format_full_numbers_steps() {
        let full = ErrorCode::ContextMissingField.entry().format_full();
        assert!(full.starts_with("[DBR-E200]"));
        assert!(full.contains("  1. "));
        assert!(full.contains("  2. "));
    }
}
