//! Machine-readable output shared by `dbr` subcommands.
//!
//! Failures printed with `--json` use [`ApiError`], built from the same
//! [`ErrorCode`] catalog the library errors map into.

pub mod schema;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorCategory, ErrorCode};

/// Version of the JSON shapes emitted by `dbr`.
pub const API_VERSION: &str = "1";

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
    /// Code in `DBR-Exxx` form.
    pub code: String,
    pub category: ErrorCategory,
    /// Catalog message for the code.
    pub message: String,
    /// The concrete failure, e.g. the missing key.
    pub detail: String,
    pub remediation: Vec<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        let entry = code.entry();
        Self {
            code: entry.code,
            category: entry.category,
            message: entry.message,
            detail: detail.into(),
            remediation: entry.remediation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;

    #[test]
    fn api_error_carries_catalog_metadata() {
        let err = ContextError::MissingField {
            field: "verbosity".to_string(),
        };
        let api = ApiError::new(err.code(), err.to_string());
        assert_eq!(api.code, "DBR-E200");
        assert_eq!(api.category, ErrorCategory::Context);
        assert!(api.detail.contains("verbosity"));
        assert!(!api.remediation.is_empty());

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["category"], "context");
    }
}
