//! JSON Schema generation for `dbr` wire types.
//!
//! - manifest snapshot (what `dbr record` writes)
//! - config file (`config.toml`)
//! - structured errors and the error-code catalog

use std::fs;
use std::io;
use std::path::Path;

use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};

use crate::api::{API_VERSION, ApiError};
use crate::config::DistBuildConfig;
use crate::errors::catalog::{ErrorCategory, ErrorCode};
use crate::manifest::ManifestSnapshot;

const CATEGORIES: [ErrorCategory; 4] = [
    ErrorCategory::Config,
    ErrorCategory::Recording,
    ErrorCategory::Context,
    ErrorCategory::Internal,
];

#[must_use]
pub fn generate_manifest_schema() -> RootSchema {
    schema_for!(ManifestSnapshot)
}

#[must_use]
pub fn generate_config_schema() -> RootSchema {
    schema_for!(DistBuildConfig)
}

#[must_use]
pub fn generate_api_error_schema() -> RootSchema {
    schema_for!(ApiError)
}

/// Machine-readable error code entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCodeEntry {
    /// Error code in DBR-Exxx format.
    pub code: String,
    pub number: u16,
    pub category: ErrorCategory,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCategoryEntry {
    pub id: ErrorCategory,
    pub name: String,
    pub description: String,
    /// Code range (e.g., "001-099").
    pub code_range: String,
}

/// Complete error catalog for machine consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCatalog {
    pub schema_version: String,
    pub api_version: String,
    pub categories: Vec<ErrorCategoryEntry>,
    pub errors: Vec<ErrorCodeEntry>,
}

#[must_use]
pub fn generate_error_catalog() -> ErrorCatalog {
    let categories = CATEGORIES
        .iter()
        .map(|category| ErrorCategoryEntry {
            id: *category,
            name: category.name().to_string(),
            description: category.description().to_string(),
            code_range: category.code_range().to_string(),
        })
        .collect();

    let errors = ErrorCode::all()
        .iter()
        .map(|code| {
            let entry = code.entry();
            ErrorCodeEntry {
                code: entry.code,
                number: code.code_number(),
                category: entry.category,
                message: entry.message,
                remediation: entry.remediation,
            }
        })
        .collect();

    ErrorCatalog {
        schema_version: "1.0".to_string(),
        api_version: API_VERSION.to_string(),
        categories,
        errors,
    }
}

/// Write every schema plus the error catalog into `output_dir`, returning
/// the written paths.
pub fn export_schemas(output_dir: &Path) -> io::Result<Vec<String>> {
    fs::create_dir_all(output_dir)?;

    let documents = [
        (
            "manifest.schema.json",
            serde_json::to_string_pretty(&generate_manifest_schema())?,
        ),
        (
            "config.schema.json",
            serde_json::to_string_pretty(&generate_config_schema())?,
        ),
        (
            "api-error.schema.json",
            serde_json::to_string_pretty(&generate_api_error_schema())?,
        ),
        (
            "error-codes.json",
            serde_json::to_string_pretty(&generate_error_catalog())?,
        ),
    ];

    let mut files = Vec::new();
    for (name, body) in documents {
        let path = output_dir.join(name);
        fs::write(&path, body)?;
        files.push(path.display().to_string());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_schema_names_entry_kinds() {
        let json = serde_json::to_string(&generate_manifest_schema()).unwrap();
        for kind in ["FILE", "DIRECTORY", "ROOT_SYMLINK", "ARCHIVE_MEMBER"] {
            assert!(json.contains(kind), "schema lacks {kind}");
        }
        assert!(json.contains("children"));
        assert!(json.contains("target"));
    }

    #[test]
    fn config_schema_has_sections() {
        let json = serde_json::to_string(&generate_config_schema()).unwrap();
        assert!(json.contains("max_symlink_depth"));
        assert!(json.contains("log_level"));
    }

    #[test]
    fn catalog_lists_every_code_once() {
        let catalog = generate_error_catalog();
        assert_eq!(catalog.categories.len(), 4);
        assert_eq!(catalog.errors.len(), ErrorCode::all().len());
        let mut codes = catalog
            .errors
            .iter()
            .map(|e| e.code.clone())
            .collect::<Vec<_>>();
        codes.dedup();
        assert_eq!(codes.len(), catalog.errors.len());
        assert!(codes.contains(&"DBR-E101".to_string()));
    }

    #[test]
    fn export_writes_all_documents() {
        let dir = tempfile::tempdir().unwrap();
        let files = export_schemas(dir.path()).unwrap();
        assert_eq!(files.len(), 4);
        assert!(dir.path().join("error-codes.json").is_file());
    }
}
