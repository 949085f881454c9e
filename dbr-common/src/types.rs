//! Common types shared by the manifest and the recorder.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hex-encoded content digest.
///
/// Digests we compute ourselves are blake3 (64 lowercase hex characters);
/// digests handed back by a delegate hasher only need to be non-empty hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash an arbitrary byte slice with blake3.
    pub fn of_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(blake3::hash(bytes.as_ref()).to_hex().to_string())
    }

    /// Wrap an existing hex digest, normalizing it to lowercase.
    ///
    /// Returns `None` for empty input or non-hex characters.
    pub fn from_hex(hex: impl AsRef<str>) -> Option<Self> {
        let hex = hex.as_ref();
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(hex.to_ascii_lowercase()))
    }

    pub(crate) fn from_blake3(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path rendered with `/` separators regardless of host platform.
///
/// Project-internal paths are stored relative to the project root; symlink
/// targets outside the project are stored as absolute real paths.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct UnixPath(String);

impl UnixPath {
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        if std::path::MAIN_SEPARATOR == '/' {
            Self(path)
        } else {
            Self(path.replace(std::path::MAIN_SEPARATOR, "/"))
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a child name with a single `/`.
    pub fn join(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }
}

impl std::fmt::Display for UnixPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnixPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Address of a single member inside a zip/jar archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveMemberPath {
    pub archive: PathBuf,
    pub member: PathBuf,
}

impl ArchiveMemberPath {
    pub fn new(archive: impl Into<PathBuf>, member: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            member: member.into(),
        }
    }

    /// Member name as stored inside the archive (always `/`-separated).
    pub fn member_name(&self) -> String {
        UnixPath::from_path(&self.member).as_str().to_string()
    }
}

impl std::fmt::Display for ArchiveMemberPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!/{}", self.archive.display(), self.member_name())
    }
}
