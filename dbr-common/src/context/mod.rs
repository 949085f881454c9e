//! Execution-context handoff protocol.
//!
//! A compile action's configuration crosses the machine boundary as a
//! [`WireMap`]: a flat, string-keyed JSON object holding only data. Live
//! resources (event sink, stderr, class-loader cache, codec, process
//! executor) never travel; the receiving side supplies its own when it
//! rebuilds the context. [`WireCodec`] encodes that split: `to_wire` takes
//! only `&self`, `from_wire` takes the map plus a resources bundle.

mod class_usage;
mod direct_to_jar;
mod execution;
mod package_finder;
mod resources;
mod verbosity;

pub use class_usage::ClassUsageWriter;
pub use direct_to_jar::DirectToJarSettings;
pub use execution::{ExecutionContext, ExecutionData, deserialize_context, keys, serialize_context};
pub use package_finder::PackageFinder;
pub use resources::{
    ClassLoader, ClassLoaderCache, EventLevel, EventSink, ExecutionResources, JsonCodec,
    PayloadCodec, ProcessExecutor, ProcessOutput, ProcessRequest, SharedWriter,
    StdProcessExecutor, TracingEventSink,
};
pub use verbosity::Verbosity;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::errors::ErrorCode;

/// Wire form of a context or one of its collaborators.
pub type WireMap = serde_json::Map<String, Value>;

/// Two-way mapping between a value and its [`WireMap`].
///
/// Anything that cannot be represented as data is passed to `from_wire` as
/// `Resources` rather than read from the map.
pub trait WireCodec: Sized {
    type Resources;

    fn to_wire(&self) -> WireMap;

    fn from_wire(map: &WireMap, resources: Self::Resources) -> Result<Self, ContextError>;
}

/// Structural failures while rebuilding a value from its wire form.
///
/// `field` is the dotted path of the offending key, e.g.
/// `java_package_finder.fallback.type`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("field `{field}` has unknown value `{value}`")]
    UnknownVariant { field: String, value: String },
}

impl ContextError {
    /// Dotted path of the offending key.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidField { field, .. }
            | Self::UnknownVariant { field, .. } => field,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::ContextMissingField,
            Self::InvalidField { .. } => ErrorCode::ContextInvalidField,
            Self::UnknownVariant { .. } => ErrorCode::ContextUnknownVariant,
        }
    }

    /// Re-anchor an error raised by a nested codec under `parent`.
    pub(crate) fn nested(self, parent: &str) -> Self {
        let prefix = |field: String| format!("{parent}.{field}");
        match self {
            Self::MissingField { field } => Self::MissingField {
                field: prefix(field),
            },
            Self::InvalidField { field, expected } => Self::InvalidField {
                field: prefix(field),
                expected,
            },
            Self::UnknownVariant { field, value } => Self::UnknownVariant {
                field: prefix(field),
                value,
            },
        }
    }

    fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }
}

// Field readers shared by the codecs. A JSON `null` counts as absent.

fn present<'a>(map: &'a WireMap, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn required<'a>(map: &'a WireMap, key: &str) -> Result<&'a Value, ContextError> {
    present(map, key).ok_or_else(|| ContextError::MissingField {
        field: key.to_string(),
    })
}

pub(crate) fn read_str<'a>(map: &'a WireMap, key: &str) -> Result<&'a str, ContextError> {
    required(map, key)?
        .as_str()
        .ok_or_else(|| ContextError::invalid(key, "a string"))
}

pub(crate) fn read_optional_str(map: &WireMap, key: &str) -> Result<Option<String>, ContextError> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ContextError::invalid(key, "a string")),
    }
}

pub(crate) fn read_map<'a>(map: &'a WireMap, key: &str) -> Result<&'a WireMap, ContextError> {
    required(map, key)?
        .as_object()
        .ok_or_else(|| ContextError::invalid(key, "a mapping"))
}

pub(crate) fn read_optional_map<'a>(
    map: &'a WireMap,
    key: &str,
) -> Result<Option<&'a WireMap>, ContextError> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(ContextError::invalid(key, "a mapping")),
    }
}

pub(crate) fn read_str_list(map: &WireMap, key: &str) -> Result<Vec<String>, ContextError> {
    let items = required(map, key)?
        .as_array()
        .ok_or_else(|| ContextError::invalid(key, "a list of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ContextError::invalid(format!("{key}.{index}"), "a string"))
        })
        .collect()
}

pub(crate) fn read_str_map(
    map: &WireMap,
    key: &str,
) -> Result<BTreeMap<String, String>, ContextError> {
    let entries = required(map, key)?
        .as_object()
        .ok_or_else(|| ContextError::invalid(key, "a string-to-string mapping"))?;
    entries
        .iter()
        .map(|(name, value)| {
            value
                .as_str()
                .map(|value| (name.clone(), value.to_string()))
                .ok_or_else(|| ContextError::invalid(format!("{key}.{name}"), "a string"))
        })
        .collect()
}

pub(crate) fn str_list(items: impl IntoIterator<Item = impl Into<String>>) -> Value {
    Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: Value) -> WireMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_errors_prefix_the_parent_key() {
        let err = ContextError::MissingField {
            field: "type".to_string(),
        }
        .nested("fallback")
        .nested("java_package_finder");
        assert_eq!(err.field(), "java_package_finder.fallback.type");
        assert_eq!(err.code(), ErrorCode::ContextMissingField);
    }

    #[test]
    fn null_counts_as_absent() {
        let map = wire(json!({"a": null}));
        assert_eq!(
            read_str(&map, "a"),
            Err(ContextError::MissingField {
                field: "a".to_string()
            })
        );
        assert_eq!(read_optional_str(&map, "a"), Ok(None));
        assert_eq!(read_optional_map(&map, "a"), Ok(None));
    }

    #[test]
    fn wrong_types_name_the_field() {
        let map = wire(json!({"list": ["ok", 3], "env": {"A": 1}, "s": 5}));
        assert_eq!(read_str_list(&map, "list").unwrap_err().field(), "list.1");
        assert_eq!(read_str_map(&map, "env").unwrap_err().field(), "env.A");
        assert!(matches!(
            read_str(&map, "s"),
            Err(ContextError::InvalidField { expected: "a string", .. })
        ));
        assert!(matches!(
            read_map(&map, "s"),
            Err(ContextError::InvalidField { .. })
        ));
    }
}
