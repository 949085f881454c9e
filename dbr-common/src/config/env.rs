//! Environment variable parsing with type safety.
//!
//! Every variable is read with the `DBR_` prefix. Bad values fall back to the
//! default and are collected so all of them can be reported at once.

use super::source::Sourced;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// Type-safe environment variable parser.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl EnvParser {
    /// Create a new parser with the DBR_ prefix.
    pub fn new() -> Self {
        Self {
            prefix: "DBR_",
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Raw string, `None` when unset or empty.
    pub fn get_optional_string(&mut self, name: &str) -> Option<Sourced<String>> {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) if !value.is_empty() => Some(Sourced::from_env(value, var_name)),
            _ => None,
        }
    }

    /// Integer in `min..=max`, `None` when unset or invalid.
    pub fn get_usize_range(&mut self, name: &str, min: usize, max: usize) -> Option<Sourced<usize>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok()?;
        match value.trim().parse::<usize>() {
            Ok(n) if n >= min && n <= max => Some(Sourced::from_env(n, var_name)),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var: var_name,
                    value: n.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
                None
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var: var_name,
                    expected: "unsigned integer".to_string(),
                    value,
                });
                None
            }
        }
    }

    /// `tracing` level directive, lowercased.
    pub fn get_log_level(&mut self, name: &str) -> Option<Sourced<String>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok()?;
        let lower = value.to_lowercase();
        match lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                Some(Sourced::from_env(lower, var_name))
            }
            _ => {
                self.errors.push(EnvError::InvalidLogLevel {
                    var: var_name,
                    value,
                });
                None
            }
        }
    }

    /// Path with `~/` expanded against the home directory.
    pub fn get_path(&mut self, name: &str) -> Option<Sourced<PathBuf>> {
        let var_name = self.var_name(name);
        let value = env::var(&var_name).ok().filter(|v| !v.is_empty())?;
        let expanded = match value.strip_prefix("~/") {
            Some(stripped) => match dirs::home_dir() {
                Some(home) => home.join(stripped),
                None => PathBuf::from(&value),
            },
            None => PathBuf::from(&value),
        };
        Some(Sourced::from_env(expanded, var_name))
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    fn cleanup_env(vars: &[&str]) {
        for var in vars {
            // SAFETY: env-mutating tests hold env_test_lock
            unsafe { env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env-mutating tests hold env_test_lock
        unsafe { env::set_var(key, value) };
    }

    #[test]
    fn test_get_usize_range_valid() {
        let _guard = env_test_lock();
        let vars = ["DBR_TEST_USIZE"];
        cleanup_env(&vars);

        set_env("DBR_TEST_USIZE", "50");
        let mut parser = EnvParser::new();
        let result = parser.get_usize_range("TEST_USIZE", 1, 100).unwrap();
        assert_eq!(result.value, 50);
        assert_eq!(result.origin.as_deref(), Some("DBR_TEST_USIZE"));
        assert!(!parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_usize_range_rejects_out_of_range_and_garbage() {
        let _guard = env_test_lock();
        let vars = ["DBR_TEST_USIZE_OOR", "DBR_TEST_USIZE_BAD"];
        cleanup_env(&vars);

        set_env("DBR_TEST_USIZE_OOR", "200");
        set_env("DBR_TEST_USIZE_BAD", "lots");
        let mut parser = EnvParser::new();
        assert!(parser.get_usize_range("TEST_USIZE_OOR", 1, 100).is_none());
        assert!(parser.get_usize_range("TEST_USIZE_BAD", 1, 100).is_none());
        let errors = parser.take_errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], EnvError::OutOfRange { .. }));
        assert!(matches!(errors[1], EnvError::InvalidValue { .. }));
        assert!(!parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_get_log_level() {
        let _guard = env_test_lock();
        let vars = ["DBR_TEST_LEVEL"];
        cleanup_env(&vars);

        set_env("DBR_TEST_LEVEL", "DEBUG");
        let mut parser = EnvParser::new();
        assert_eq!(parser.get_log_level("TEST_LEVEL").unwrap().value, "debug");

        set_env("DBR_TEST_LEVEL", "chatty");
        assert!(parser.get_log_level("TEST_LEVEL").is_none());
        assert!(parser.has_errors());

        cleanup_env(&vars);
    }

    #[test]
    fn test_unset_values_are_none() {
        let _guard = env_test_lock();
        cleanup_env(&["DBR_TEST_UNSET"]);
        let mut parser = EnvParser::new();
        assert!(parser.get_optional_string("TEST_UNSET").is_none());
        assert!(parser.get_path("TEST_UNSET").is_none());
        assert!(parser.get_usize_range("TEST_UNSET", 0, 1).is_none());
    }

    #[test]
    fn test_get_path_expands_home() {
        let _guard = env_test_lock();
        let vars = ["DBR_TEST_PATH"];
        set_env("DBR_TEST_PATH", "~/logs");
        let mut parser = EnvParser::new();
        let path = parser.get_path("TEST_PATH").unwrap().value;
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("logs"));
        }
        cleanup_env(&vars);
    }
}
